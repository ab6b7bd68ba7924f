//! Outbound message model.
//!
//! A reply is either plain text or a structured payload. Both are wrapped in
//! the Cloud API envelope (`messaging_product` + `to`) right before delivery:
//!
//! ```text
//! Text("hi")                 → { messaging_product, to, type: "text", text: { body: "hi" } }
//! Payload({type: "image"..}) → { messaging_product, to, type: "image", .. }
//! ```

use serde_json::{Map, Value, json};

/// Product identifier required on every outbound request.
pub const MESSAGING_PRODUCT: &str = "whatsapp";

/// A message to be delivered to a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    /// Plain text, wrapped as a `text` message.
    Text(String),
    /// A structured payload merged into the envelope as-is.
    Payload(Map<String, Value>),
}

/// Media kinds that can be sent by link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Document,
    Audio,
    Video,
}

impl MediaKind {
    /// Returns the Cloud API type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl OutgoingMessage {
    /// Creates a text message.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    /// Creates a media message that points at a public URL.
    pub fn media(kind: MediaKind, link: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("type".into(), Value::from(kind.as_str()));
        payload.insert(kind.as_str().into(), json!({ "link": link.into() }));
        Self::Payload(payload)
    }

    /// Shallow-merges `extra` over this message; fields in `extra` win.
    ///
    /// A text message is first turned into its structured form so the merge
    /// has something to land on.
    pub fn merge(self, extra: Map<String, Value>) -> Self {
        let mut payload = match self {
            Self::Payload(payload) => payload,
            Self::Text(body) => text_payload(body),
        };
        payload.extend(extra);
        Self::Payload(payload)
    }

    /// Returns the text body if this is a text message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(body) => Some(body),
            Self::Payload(_) => None,
        }
    }

    /// Wraps this message in the request envelope addressed to `to`.
    pub fn into_envelope(self, to: &str) -> Value {
        let mut envelope = Map::new();
        envelope.insert("messaging_product".into(), Value::from(MESSAGING_PRODUCT));
        envelope.insert("to".into(), Value::from(to));

        let payload = match self {
            Self::Text(body) => text_payload(body),
            Self::Payload(payload) => payload,
        };
        envelope.extend(payload);

        Value::Object(envelope)
    }
}

fn text_payload(body: String) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("type".into(), Value::from("text"));
    payload.insert("text".into(), json!({ "body": body }));
    payload
}

impl From<&str> for OutgoingMessage {
    fn from(body: &str) -> Self {
        Self::Text(body.to_string())
    }
}

impl From<String> for OutgoingMessage {
    fn from(body: String) -> Self {
        Self::Text(body)
    }
}

impl From<Map<String, Value>> for OutgoingMessage {
    fn from(payload: Map<String, Value>) -> Self {
        Self::Payload(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_envelope() {
        let envelope = OutgoingMessage::text("Welcome").into_envelope("123");
        assert_eq!(
            envelope,
            json!({
                "messaging_product": "whatsapp",
                "to": "123",
                "type": "text",
                "text": { "body": "Welcome" }
            })
        );
    }

    #[test]
    fn test_payload_envelope_keeps_payload_fields() {
        let message = OutgoingMessage::media(MediaKind::Document, "https://x/doc.pdf");
        let envelope = message.into_envelope("123");

        assert_eq!(envelope["type"], "document");
        assert_eq!(envelope["document"]["link"], "https://x/doc.pdf");
        assert_eq!(envelope["messaging_product"], "whatsapp");
    }

    #[test]
    fn test_merge_is_shallow_and_extra_wins() {
        let mut extra = Map::new();
        extra.insert("image".into(), json!({ "link": "https://x/other.jpg" }));
        extra.insert("interactive".into(), json!({ "type": "button" }));

        let merged = OutgoingMessage::media(MediaKind::Image, "https://x/a.jpg").merge(extra);
        let OutgoingMessage::Payload(payload) = merged else {
            panic!("expected payload");
        };

        assert_eq!(payload["type"], "image");
        assert_eq!(payload["image"], json!({ "link": "https://x/other.jpg" }));
        assert_eq!(payload["interactive"]["type"], "button");
    }
}
