//! Error types for the WhatsApp adapter.

use thiserror::Error;

/// Errors raised while building the adapter from its configuration.
#[derive(Debug, Error)]
pub enum WhatsAppConfigError {
    /// One or more required credentials are empty.
    #[error("WhatsApp adapter requires {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    /// The API base URL is empty or not an http(s) URL.
    #[error("invalid WhatsApp API base URL '{0}'")]
    InvalidBaseUrl(String),

    /// The HTTP client could not be created.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Errors raised while building interactive markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    /// Reply buttons must be given as exactly one row.
    #[error("WhatsApp reply buttons only support a single row, got {0}")]
    RowCount(usize),

    /// A row holds more than three buttons.
    #[error("WhatsApp reply buttons only support up to 3 buttons per row, got {0}")]
    TooManyButtons(usize),

    /// A row holds no buttons.
    #[error("WhatsApp reply keyboards need at least one button")]
    EmptyRow,

    /// URL buttons do not exist on WhatsApp.
    #[error(
        "WhatsApp does not support URL buttons; use reply buttons or include links in the message text"
    )]
    UrlButtonUnsupported,
}
