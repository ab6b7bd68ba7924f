//! Inbound event model.
//!
//! [`InboundEvent`] mirrors one entry of `value.messages` in a WhatsApp Cloud
//! API webhook delivery. Only the fields the dispatcher reads are typed; every
//! other field is kept in `extra` so handlers can still reach it.
//!
//! ```text
//! { "from": "123", "type": "interactive",
//!   "interactive": { "type": "button_reply",
//!                    "button_reply": { "id": "yes", "title": "Yes" } } }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single raw inbound message event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Sender identifier; used as the conversation identity.
    pub from: String,

    /// Platform message id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Platform timestamp (seconds since epoch, as a string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Raw type discriminator (`text`, `interactive`, `image`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Plain text payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,

    /// Interactive reply payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive: Option<InteractiveContent>,

    /// Quick-reply template button payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<ButtonContent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaAttachment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<MediaAttachment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<MediaAttachment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaAttachment>,

    /// Every field not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboundEvent {
    /// Creates a plain text event, mostly useful in tests and demos.
    pub fn text(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            text: Some(TextContent { body: body.into() }),
            ..Self::bare(from, "text")
        }
    }

    /// Creates an interactive button reply event.
    pub fn button_reply(
        from: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            interactive: Some(InteractiveContent {
                kind: Some("button_reply".to_string()),
                button_reply: Some(ButtonReply {
                    id: Some(id.into()),
                    title: Some(title.into()),
                }),
                extra: Map::new(),
            }),
            ..Self::bare(from, "interactive")
        }
    }

    /// Creates an event with only a sender and a type.
    pub fn bare(from: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            id: None,
            timestamp: None,
            kind: kind.into(),
            text: None,
            interactive: None,
            button: None,
            image: None,
            document: None,
            audio: None,
            video: None,
            extra: Map::new(),
        }
    }

    /// Returns the normalized text of this event.
    ///
    /// Precedence: interactive reply id, interactive reply title, text body,
    /// button text. Empty strings are skipped.
    pub fn normalized_text(&self) -> Option<String> {
        let reply = self
            .interactive
            .as_ref()
            .and_then(|i| i.button_reply.as_ref());

        [
            reply.and_then(|r| r.id.as_deref()),
            reply.and_then(|r| r.title.as_deref()),
            self.text.as_ref().map(|t| t.body.as_str()),
            self.button.as_ref().and_then(|b| b.text.as_deref()),
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .map(str::to_owned)
    }

    /// Returns the dispatch category this event is routed under.
    pub fn category(&self) -> EventCategory {
        EventCategory::from_event_type(&self.kind)
    }
}

/// `text` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: String,
}

/// `interactive` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveContent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_reply: Option<ButtonReply>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The button a user tapped in an interactive message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// `button` payload (template quick replies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// A media descriptor attached to an image/document/audio/video event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// EventCategory
// =============================================================================

/// The normalized kind an event is dispatched under.
///
/// `text` and `interactive` events both map to [`EventCategory::Message`];
/// every other raw type maps to its own category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Message,
    Image,
    Document,
    Audio,
    Video,
    Other(String),
}

impl EventCategory {
    /// Resolves the category for a raw event type.
    pub fn from_event_type(kind: &str) -> Self {
        match kind {
            "text" | "interactive" | "message" => Self::Message,
            "image" => Self::Image,
            "document" => Self::Document,
            "audio" => Self::Audio,
            "video" => Self::Video,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the category name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "message",
            Self::Image => "image",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for EventCategory {
    fn from(kind: &str) -> Self {
        Self::from_event_type(kind)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> InboundEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_event_parses() {
        let event = parse(json!({
            "from": "123",
            "id": "wamid.1",
            "timestamp": "1700000000",
            "type": "text",
            "text": { "body": "/start" }
        }));

        assert_eq!(event.from, "123");
        assert_eq!(event.kind, "text");
        assert_eq!(event.normalized_text().as_deref(), Some("/start"));
        assert_eq!(event.category(), EventCategory::Message);
    }

    #[test]
    fn test_button_reply_id_wins_over_title() {
        let event = parse(json!({
            "from": "123",
            "type": "interactive",
            "interactive": {
                "type": "button_reply",
                "button_reply": { "id": "opt_yes", "title": "Yes" }
            }
        }));

        assert_eq!(event.normalized_text().as_deref(), Some("opt_yes"));
        assert_eq!(event.category(), EventCategory::Message);
    }

    #[test]
    fn test_empty_reply_id_falls_back_to_title() {
        let event = parse(json!({
            "from": "123",
            "type": "interactive",
            "interactive": { "button_reply": { "id": "", "title": "Yes" } }
        }));

        assert_eq!(event.normalized_text().as_deref(), Some("Yes"));
    }

    #[test]
    fn test_template_button_text() {
        let event = parse(json!({
            "from": "123",
            "type": "button",
            "button": { "text": "Stop promotions", "payload": "STOP" }
        }));

        assert_eq!(event.normalized_text().as_deref(), Some("Stop promotions"));
        assert_eq!(event.category(), EventCategory::Other("button".into()));
    }

    #[test]
    fn test_media_event_has_no_text() {
        let event = parse(json!({
            "from": "123",
            "type": "image",
            "image": { "id": "media-1", "mime_type": "image/jpeg", "sha256": "abc" }
        }));

        assert_eq!(event.normalized_text(), None);
        assert_eq!(event.category(), EventCategory::Image);
        assert_eq!(
            event.image.as_ref().and_then(|m| m.id.as_deref()),
            Some("media-1")
        );
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let event = parse(json!({
            "from": "123",
            "type": "location",
            "location": { "latitude": 1.0, "longitude": 2.0 }
        }));

        assert!(event.extra.contains_key("location"));
        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["location"]["latitude"], json!(1.0));
    }

    #[test]
    fn test_category_names() {
        assert_eq!(EventCategory::from("text").as_str(), "message");
        assert_eq!(EventCategory::from("video"), EventCategory::Video);
        assert_eq!(EventCategory::from("sticker").to_string(), "sticker");
    }
}
