//! Test helpers.
//!
//! [`RecordingSender`] stands in for the platform client: it keeps every
//! message it is asked to deliver so tests can assert on replies without a
//! network.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use chirp_core::{Delivery, MessageSender, OutgoingMessage, SendError, SendResult};

/// A [`MessageSender`] that records deliveries in memory.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    fail: bool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender that records every message and then reports an HTTP failure.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Returns every `(recipient, message)` pair seen so far.
    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().clone()
    }

    /// Returns the text bodies delivered to `to`, in order.
    pub fn texts_to(&self, to: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(recipient, _)| recipient == to)
            .filter_map(|(_, message)| message.as_text().map(str::to_owned))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(&self, to: &str, message: OutgoingMessage) -> SendResult {
        let mut sent = self.sent.lock();
        sent.push((to.to_owned(), message));
        if self.fail {
            return Err(SendError::Http {
                status: 500,
                body: "recording sender configured to fail".into(),
            });
        }
        let id = format!("wamid.test.{}", sent.len());
        Ok(Delivery::from_response(json!({ "messages": [{ "id": id }] })))
    }
}
