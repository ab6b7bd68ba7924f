//! Webhook seam between the HTTP transport and a platform adapter.
//!
//! The transport owns sockets and routing; the adapter owns the payload
//! format. They meet at [`WebhookHandler`]:
//!
//! ```text
//! GET  {path}?hub.mode=..  → WebhookHandler::verify   → 200 challenge | 403
//! POST {path}  <json body> → WebhookHandler::receive  → 200 | 400 | 404
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

/// A type-erased webhook handler.
pub type BoxedWebhookHandler = Arc<dyn WebhookHandler>;

/// How a delivered webhook body was treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The body was understood and its events were dispatched.
    Accepted,
    /// The body is well-formed JSON but not addressed to this handler.
    NotFound,
    /// The body could not be parsed.
    BadRequest,
}

impl WebhookOutcome {
    /// Returns the HTTP status code for this outcome.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Accepted => 200,
            Self::NotFound => 404,
            Self::BadRequest => 400,
        }
    }
}

/// Handles the two webhook calls a platform makes.
#[async_trait]
pub trait WebhookHandler: Send + Sync + 'static {
    /// Answers a subscription check.
    ///
    /// Returns the body to echo back on success, or `None` to refuse.
    fn verify(&self, query: &HashMap<String, String>) -> Option<String>;

    /// Processes a delivered body. Returns once every event in it has been
    /// dispatched.
    async fn receive(&self, body: &[u8]) -> WebhookOutcome;
}
