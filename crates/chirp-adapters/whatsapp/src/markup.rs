//! Interactive reply buttons.
//!
//! WhatsApp reply buttons are limited to a single row of at most three
//! buttons. Each button's label doubles as its id, so a tap comes back as a
//! message whose text is the label and can be matched with `hears`.
//!
//! ```rust,ignore
//! let keyboard = Markup::keyboard("Pick one", vec![vec!["Yes".into(), "No".into()]])?;
//! ctx.reply(keyboard).await?;
//! ```

use serde_json::{Map, Value, json};

use chirp_core::OutgoingMessage;

use crate::error::MarkupError;

/// Maximum number of reply buttons in one message.
pub const MAX_REPLY_BUTTONS: usize = 3;

/// A button in a keyboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// A quick-reply button; the label is also its id.
    Reply(String),
    /// A link button. Accepted by the type so callers get a proper error,
    /// but WhatsApp has no such thing.
    Url { text: String, url: String },
}

impl Button {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }
}

impl From<&str> for Button {
    fn from(text: &str) -> Self {
        Self::Reply(text.to_owned())
    }
}

impl From<String> for Button {
    fn from(text: String) -> Self {
        Self::Reply(text)
    }
}

/// Builders for interactive payloads.
#[derive(Debug, Clone, Copy)]
pub struct Markup;

impl Markup {
    /// URL buttons are not available on WhatsApp; this always fails.
    pub fn url_button(
        _text: impl Into<String>,
        _url: impl Into<String>,
    ) -> Result<Button, MarkupError> {
        Err(MarkupError::UrlButtonUnsupported)
    }

    /// Builds a reply-button message with `text` as the body.
    ///
    /// `rows` must hold exactly one row of one to three reply buttons.
    pub fn keyboard(
        text: impl Into<String>,
        rows: Vec<Vec<Button>>,
    ) -> Result<Keyboard, MarkupError> {
        let [row] = <[Vec<Button>; 1]>::try_from(rows)
            .map_err(|rows| MarkupError::RowCount(rows.len()))?;

        if row.is_empty() {
            return Err(MarkupError::EmptyRow);
        }
        if row.len() > MAX_REPLY_BUTTONS {
            return Err(MarkupError::TooManyButtons(row.len()));
        }

        let buttons = row
            .into_iter()
            .map(|button| match button {
                Button::Reply(label) => Ok(json!({
                    "type": "reply",
                    "reply": { "id": label, "title": label },
                })),
                Button::Url { .. } => Err(MarkupError::UrlButtonUnsupported),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut payload = Map::new();
        payload.insert("type".into(), Value::from("interactive"));
        payload.insert(
            "interactive".into(),
            json!({
                "type": "button",
                "body": { "text": text.into() },
                "action": { "buttons": buttons },
            }),
        );
        Ok(Keyboard(payload))
    }
}

/// An interactive reply-button payload.
///
/// Send it on its own with `reply`, or merge it into another message such as
/// `reply_with_photo`'s extra fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyboard(Map<String, Value>);

impl Keyboard {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Keyboard> for OutgoingMessage {
    fn from(keyboard: Keyboard) -> Self {
        OutgoingMessage::Payload(keyboard.0)
    }
}

impl From<Keyboard> for Map<String, Value> {
    fn from(keyboard: Keyboard) -> Self {
        keyboard.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_payload() {
        let keyboard = Markup::keyboard("Choose", vec![vec!["Yes".into(), "No".into()]]).unwrap();
        let envelope = OutgoingMessage::from(keyboard).into_envelope("123");

        assert_eq!(
            envelope,
            json!({
                "messaging_product": "whatsapp",
                "to": "123",
                "type": "interactive",
                "interactive": {
                    "type": "button",
                    "body": { "text": "Choose" },
                    "action": {
                        "buttons": [
                            { "type": "reply", "reply": { "id": "Yes", "title": "Yes" } },
                            { "type": "reply", "reply": { "id": "No", "title": "No" } }
                        ]
                    }
                }
            })
        );
    }

    #[test]
    fn test_rejects_multiple_rows() {
        let err = Markup::keyboard("x", vec![vec!["a".into()], vec!["b".into()]]).unwrap_err();
        assert_eq!(err, MarkupError::RowCount(2));

        let err = Markup::keyboard("x", Vec::new()).unwrap_err();
        assert_eq!(err, MarkupError::RowCount(0));
    }

    #[test]
    fn test_rejects_more_than_three_buttons() {
        let row = ["a", "b", "c", "d"].into_iter().map(Button::from).collect();
        let err = Markup::keyboard("x", vec![row]).unwrap_err();
        assert_eq!(err, MarkupError::TooManyButtons(4));
    }

    #[test]
    fn test_rejects_url_buttons() {
        assert_eq!(
            Markup::url_button("Docs", "https://example.com"),
            Err(MarkupError::UrlButtonUnsupported)
        );

        let row = vec![Button::Url {
            text: "Docs".into(),
            url: "https://example.com".into(),
        }];
        assert_eq!(
            Markup::keyboard("x", vec![row]).unwrap_err(),
            MarkupError::UrlButtonUnsupported
        );
    }
}
