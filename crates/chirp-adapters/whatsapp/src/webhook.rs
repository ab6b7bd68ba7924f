//! Webhook payloads and the handler that feeds them to a dispatcher.
//!
//! A Cloud API notification looks like this (trimmed):
//!
//! ```json
//! {
//!   "object": "whatsapp_business_account",
//!   "entry": [{
//!     "id": "WABA_ID",
//!     "changes": [{
//!       "field": "messages",
//!       "value": {
//!         "messaging_product": "whatsapp",
//!         "metadata": { "phone_number_id": "..." },
//!         "messages": [{ "from": "15551234567", "type": "text", "text": { "body": "hi" } }]
//!       }
//!     }]
//!   }]
//! }
//! ```
//!
//! Messages of one change are dispatched concurrently; changes are processed
//! one after another.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use chirp_core::{InboundEvent, WebhookHandler, WebhookOutcome};
use chirp_framework::Dispatcher;

/// The `object` value of WhatsApp notifications.
pub const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

/// Query parameter carrying the subscription mode.
pub const HUB_MODE: &str = "hub.mode";
/// Query parameter carrying the verify token.
pub const HUB_VERIFY_TOKEN: &str = "hub.verify_token";
/// Query parameter carrying the challenge to echo.
pub const HUB_CHALLENGE: &str = "hub.challenge";

/// A webhook notification body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

/// The `value` of a change. Only `messages` is dispatched; statuses,
/// contacts and metadata are kept as raw JSON.
///
/// A message that does not parse is logged and dropped; its siblings are
/// kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeValue {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub messages: Vec<InboundEvent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn skip_malformed<'de, D>(deserializer: D) -> Result<Vec<InboundEvent>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|message| {
            let id = message.get("id").and_then(Value::as_str).map(str::to_owned);
            serde_json::from_value(message)
                .inspect_err(|e| warn!(error = %e, ?id, "Skipping malformed message"))
                .ok()
        })
        .collect())
}

impl WebhookPayload {
    /// Returns `true` if this notification is about a WhatsApp business account.
    pub fn is_business_account(&self) -> bool {
        self.object == BUSINESS_ACCOUNT_OBJECT
    }

    /// Returns the messages of every change, one batch per change, skipping
    /// changes without messages.
    pub fn message_batches(self) -> Vec<Vec<InboundEvent>> {
        self.entry
            .into_iter()
            .flat_map(|entry| entry.changes)
            .map(|change| change.value.messages)
            .filter(|messages| !messages.is_empty())
            .collect()
    }
}

/// Checks a subscription request.
///
/// Succeeds with the challenge when the mode is `subscribe` and the token
/// matches `verify_token`.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &str,
) -> Option<String> {
    if mode == Some("subscribe") && token == Some(verify_token) {
        Some(challenge.unwrap_or_default().to_owned())
    } else {
        None
    }
}

/// Bridges webhook calls to a [`Dispatcher`].
pub struct WhatsAppWebhook {
    dispatcher: Arc<Dispatcher>,
    verify_token: String,
}

impl WhatsAppWebhook {
    pub fn new(dispatcher: Arc<Dispatcher>, verify_token: impl Into<String>) -> Self {
        Self {
            dispatcher,
            verify_token: verify_token.into(),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl std::fmt::Debug for WhatsAppWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppWebhook")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WebhookHandler for WhatsAppWebhook {
    fn verify(&self, query: &HashMap<String, String>) -> Option<String> {
        let challenge = verify_subscription(
            query.get(HUB_MODE).map(String::as_str),
            query.get(HUB_VERIFY_TOKEN).map(String::as_str),
            query.get(HUB_CHALLENGE).map(String::as_str),
            &self.verify_token,
        );
        match &challenge {
            Some(_) => info!("Webhook subscription verified"),
            None => warn!(mode = ?query.get(HUB_MODE), "Webhook verification refused"),
        }
        challenge
    }

    async fn receive(&self, body: &[u8]) -> WebhookOutcome {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Webhook body is not valid JSON");
                return WebhookOutcome::BadRequest;
            }
        };

        if value.get("object").and_then(Value::as_str) != Some(BUSINESS_ACCOUNT_OBJECT) {
            debug!(object = ?value.get("object"), "Ignoring webhook for another object");
            return WebhookOutcome::NotFound;
        }

        let payload: WebhookPayload = match serde_json::from_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Webhook body does not match the notification schema");
                return WebhookOutcome::BadRequest;
            }
        };

        for batch in payload.message_batches() {
            debug!(count = batch.len(), "Dispatching message batch");
            let results = self.dispatcher.dispatch_batch(batch).await;
            for err in results.into_iter().filter_map(Result::err) {
                error!(error = %format!("{err:#}"), "Event dispatch failed");
            }
        }

        WebhookOutcome::Accepted
    }
}

#[cfg(test)]
mod tests {
    use chirp_framework::testing::RecordingSender;
    use serde_json::json;

    use super::*;

    fn notification(messages: Value) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": { "phone_number_id": "555" },
                        "messages": messages
                    }
                }]
            }]
        })
    }

    fn webhook() -> (Arc<RecordingSender>, WhatsAppWebhook) {
        let sender = Arc::new(RecordingSender::new());
        let mut dispatcher = Dispatcher::new(sender.clone());
        dispatcher.command("/start", |ctx| {
            Box::pin(async move {
                ctx.reply("Welcome").await?;
                Ok(())
            })
        });
        dispatcher.command("/fail", |_ctx| {
            Box::pin(async move { Err(anyhow::anyhow!("broken handler")) })
        });
        (sender, WhatsAppWebhook::new(Arc::new(dispatcher), "secret"))
    }

    #[test]
    fn test_verify_subscription() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("secret"), Some("42"), "secret"),
            Some("42".to_string())
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("wrong"), Some("42"), "secret"),
            None
        );
        assert_eq!(
            verify_subscription(Some("unsubscribe"), Some("secret"), Some("42"), "secret"),
            None
        );
        assert_eq!(verify_subscription(None, None, None, "secret"), None);
    }

    #[test]
    fn test_verify_reads_hub_parameters() {
        let (_sender, webhook) = webhook();
        let query: HashMap<String, String> = [
            (HUB_MODE, "subscribe"),
            (HUB_VERIFY_TOKEN, "secret"),
            (HUB_CHALLENGE, "1158201444"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(webhook.verify(&query), Some("1158201444".to_string()));
    }

    #[test]
    fn test_message_batches_skip_empty_changes() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "object": "whatsapp_business_account",
            "entry": [
                { "changes": [
                    { "value": { "statuses": [{ "id": "wamid.1", "status": "read" }] } },
                    { "value": { "messages": [
                        { "from": "1", "type": "text", "text": { "body": "a" } },
                        { "from": "2", "type": "text", "text": { "body": "b" } }
                    ] } }
                ] },
                { "changes": [
                    { "value": { "messages": [{ "from": "3", "type": "image", "image": { "id": "m" } }] } }
                ] }
            ]
        }))
        .unwrap();

        assert!(payload.is_business_account());
        let batches = payload.message_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1][0].from, "3");
    }

    #[tokio::test]
    async fn test_receive_dispatches_messages() {
        let (sender, webhook) = webhook();
        let body = notification(json!([
            { "from": "123", "id": "wamid.1", "type": "text", "text": { "body": "/start" } },
            { "from": "456", "id": "wamid.2", "type": "text", "text": { "body": "/start" } }
        ]));

        let outcome = webhook.receive(body.to_string().as_bytes()).await;

        assert_eq!(outcome, WebhookOutcome::Accepted);
        assert_eq!(sender.texts_to("123"), vec!["Welcome".to_string()]);
        assert_eq!(sender.texts_to("456"), vec!["Welcome".to_string()]);
    }

    #[tokio::test]
    async fn test_receive_accepts_even_if_a_handler_fails() {
        let (sender, webhook) = webhook();
        let body = notification(json!([
            { "from": "123", "type": "text", "text": { "body": "/fail" } },
            { "from": "456", "type": "text", "text": { "body": "/start" } }
        ]));

        let outcome = webhook.receive(body.to_string().as_bytes()).await;

        assert_eq!(outcome, WebhookOutcome::Accepted);
        assert_eq!(sender.len(), 1);
    }

    #[tokio::test]
    async fn test_receive_skips_malformed_message() {
        let (sender, webhook) = webhook();
        let body = notification(json!([
            { "id": "wamid.bad", "type": "text", "text": { "body": "/start" } },
            { "from": "456", "id": "wamid.good", "type": "text", "text": { "body": "/start" } }
        ]));

        let outcome = webhook.receive(body.to_string().as_bytes()).await;

        assert_eq!(outcome, WebhookOutcome::Accepted);
        assert_eq!(sender.texts_to("456"), vec!["Welcome".to_string()]);
        assert_eq!(sender.len(), 1);
    }

    #[tokio::test]
    async fn test_receive_rejects_other_objects_and_garbage() {
        let (sender, webhook) = webhook();

        let other = json!({ "object": "page", "entry": [] }).to_string();
        assert_eq!(
            webhook.receive(other.as_bytes()).await,
            WebhookOutcome::NotFound
        );
        assert_eq!(
            webhook.receive(b"not json").await,
            WebhookOutcome::BadRequest
        );
        assert!(sender.is_empty());
    }
}
