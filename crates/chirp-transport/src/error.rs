//! Error types for the webhook transport.

use thiserror::Error;

/// Errors raised while starting or running the webhook server.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The serve loop ended with an I/O error.
    #[error("webhook server error: {0}")]
    Serve(#[from] std::io::Error),

    /// The serve task panicked or was cancelled.
    #[error("webhook server task failed: {0}")]
    Task(String),
}

/// A type alias for transport results.
pub type TransportResult<T> = Result<T, TransportError>;
