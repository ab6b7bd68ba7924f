//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while bootstrapping or running the bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The WhatsApp client could not be created.
    #[error("WhatsApp adapter error: {0}")]
    Adapter(#[from] chirp_adapter_whatsapp::WhatsAppConfigError),

    /// The session store could not be opened.
    #[error("Session store error: {0}")]
    Store(#[from] chirp_core::StoreError),

    /// The webhook server failed.
    #[error("Transport error: {0}")]
    Transport(#[from] chirp_transport::TransportError),

    /// A shutdown signal handler could not be installed.
    #[error("Failed to listen for shutdown signals: {0}")]
    Signal(#[source] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
