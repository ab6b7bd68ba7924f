//! Outbound delivery through the WhatsApp Cloud API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, trace, warn};

use chirp_core::{Delivery, MessageSender, OutgoingMessage, SendError, SendResult};

use crate::config::WhatsAppConfig;
use crate::error::WhatsAppConfigError;

/// Posts outgoing messages to `{base_url}/{api_version}/{phone_number_id}/messages`.
///
/// Failures never panic; they come back as [`SendError`] values for the
/// handler that replied to deal with.
#[derive(Debug, Clone)]
pub struct CloudApiClient {
    http: Client,
    messages_url: String,
    access_token: String,
}

impl CloudApiClient {
    /// Validates `config` and builds a client from it.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, WhatsAppConfigError> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| WhatsAppConfigError::Client(e.to_string()))?;

        Ok(Self {
            http,
            messages_url: config.messages_url(),
            access_token: config.access_token.clone(),
        })
    }

    /// Returns the endpoint messages are posted to.
    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[async_trait]
impl MessageSender for CloudApiClient {
    async fn send_message(&self, to: &str, message: OutgoingMessage) -> SendResult {
        if to.is_empty() {
            warn!("Refusing to send a message without a recipient");
            return Err(SendError::MissingRecipient);
        }

        let body = message.into_envelope(to);
        trace!(to = %to, body = %body, "Sending message");

        let resp = self
            .http
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(to = %to, error = %e, "Message delivery failed");
                SendError::Transport(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(to = %to, status = status.as_u16(), body = %text, "Cloud API rejected message");
            return Err(SendError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let response: Value = resp
            .json()
            .await
            .map_err(|e| SendError::InvalidResponse(e.to_string()))?;
        let delivery = Delivery::from_response(response);
        debug!(to = %to, message_id = ?delivery.message_id, "Message delivered");
        Ok(delivery)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn client_for(server: &mockito::Server) -> CloudApiClient {
        let config = WhatsAppConfig::new("test-token", "555", "verify").with_base_url(server.url());
        CloudApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_sends_text_envelope_with_bearer_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v23.0/555/messages")
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::Json(json!({
                "messaging_product": "whatsapp",
                "to": "123",
                "type": "text",
                "text": { "body": "Welcome" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "messages": [{ "id": "wamid.abc" }] }).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let delivery = client
            .send_message("123", OutgoingMessage::text("Welcome"))
            .await
            .unwrap();

        assert_eq!(delivery.message_id.as_deref(), Some("wamid.abc"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_payload_is_merged_into_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v23.0/555/messages")
            .match_body(Matcher::PartialJson(json!({
                "messaging_product": "whatsapp",
                "to": "123",
                "type": "image",
                "image": { "link": "https://x/a.jpg" }
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server);
        let message = OutgoingMessage::media(chirp_core::MediaKind::Image, "https://x/a.jpg");
        let delivery = client.send_message("123", message).await.unwrap();

        assert_eq!(delivery.message_id, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_returned_as_value() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v23.0/555/messages")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid OAuth access token"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .send_message("123", OutgoingMessage::text("hi"))
            .await
            .unwrap_err();

        match err {
            SendError::Http { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Invalid OAuth"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_recipient_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .send_message("", OutgoingMessage::text("hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::MissingRecipient));
        mock.assert_async().await;
    }

    #[test]
    fn test_rejects_incomplete_config() {
        let config = WhatsAppConfig::new("", "555", "verify");
        assert!(matches!(
            CloudApiClient::new(&config),
            Err(WhatsAppConfigError::MissingCredentials(_))
        ));
    }
}
