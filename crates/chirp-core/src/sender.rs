//! Outbound delivery seam.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SendError;
use crate::message::OutgoingMessage;

/// The result of a delivery attempt.
pub type SendResult = Result<Delivery, SendError>;

/// A type-erased message sender.
pub type BoxedSender = Arc<dyn MessageSender>;

/// A successful delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Platform message id, when the API returned one.
    pub message_id: Option<String>,
    /// The raw response body.
    pub response: Value,
}

impl Delivery {
    /// Builds a delivery from a Cloud API response body
    /// (`{"messages": [{"id": "wamid..."}]}`).
    pub fn from_response(response: Value) -> Self {
        let message_id = response
            .pointer("/messages/0/id")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self {
            message_id,
            response,
        }
    }
}

/// Delivers messages to a conversation.
///
/// Implementations must report failures through the returned [`SendResult`]
/// rather than panicking; the dispatcher hands the value straight back to
/// the handler that replied.
#[async_trait]
pub trait MessageSender: Send + Sync + 'static {
    /// Sends `message` to the conversation identified by `to`.
    async fn send_message(&self, to: &str, message: OutgoingMessage) -> SendResult;
}
