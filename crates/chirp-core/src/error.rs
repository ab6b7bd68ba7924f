//! Error types shared across Chirp crates.
//!
//! Handler-level failures are `anyhow::Error` and live in the framework; the
//! errors here describe the two external seams the core talks to.

use thiserror::Error;

// =============================================================================
// Store Errors
// =============================================================================

/// Errors that can occur while loading or persisting sessions.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// I/O error from a durable backend.
    #[error("session store I/O error: {0}")]
    Io(String),

    /// The stored data could not be (de)serialized.
    #[error("session store serialization error: {0}")]
    Serialization(String),

    /// The backing file does not hold a JSON object keyed by conversation id.
    #[error("session file '{path}' is malformed: {reason}")]
    Malformed {
        /// Path of the offending file.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Send Errors
// =============================================================================

/// Errors reported by a [`MessageSender`](crate::MessageSender).
///
/// Delivery failures are returned as values; senders never panic on a bad
/// response.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The destination conversation id was empty.
    #[error("recipient is missing")]
    MissingRecipient,

    /// The upstream API answered with a non-success status.
    #[error("HTTP {status} error: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for session store operations.
pub type StoreResult<T> = Result<T, StoreError>;
