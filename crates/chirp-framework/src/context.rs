//! Per-event context.
//!
//! A [`Context`] is built once for every inbound event and dropped when the
//! dispatch of that event ends. It is handed by `&mut` to each middleware,
//! scene step and handler in turn, so exactly one callback touches it at a
//! time.
//!
//! The context carries:
//!
//! - the normalized view of the event (text, attachments by kind, sender)
//! - the conversation's [`Session`], loaded before the middleware chain runs
//!   and written back after the handlers
//! - the `handled` flag, which only ever goes from `false` to `true`
//! - the active scene, if the conversation is inside one
//!
//! Every `reply*` method marks the event handled before delivery starts, so
//! a failed delivery never reopens the event to later handlers.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use chirp_core::{
    BoxedSender, InboundEvent, MediaAttachment, MediaKind, OutgoingMessage, SendResult, Session,
};

use crate::scene::Scene;

/// The context object passed to middleware, scene steps and handlers.
pub struct Context {
    sender: BoxedSender,
    chat_id: String,
    text: Option<String>,
    event: Arc<InboundEvent>,

    images: Vec<MediaAttachment>,
    documents: Vec<MediaAttachment>,
    audio: Vec<MediaAttachment>,
    video: Vec<MediaAttachment>,

    session: Session,
    handled: bool,

    scene: Option<Arc<Scene>>,
    /// Set by a scene leave; keeps the scene middleware from resuming the
    /// scene again during this dispatch.
    scene_stopped: bool,
    /// Set when the middleware chain reaches its end.
    chain_completed: bool,
}

impl Context {
    /// Creates the context for one event.
    pub fn new(sender: BoxedSender, event: InboundEvent, chat_id: impl Into<String>) -> Self {
        let text = event.normalized_text();
        let images = event.image.iter().cloned().collect();
        let documents = event.document.iter().cloned().collect();
        let audio = event.audio.iter().cloned().collect();
        let video = event.video.iter().cloned().collect();

        Self {
            sender,
            chat_id: chat_id.into(),
            text,
            event: Arc::new(event),
            images,
            documents,
            audio,
            video,
            session: Session::new(),
            handled: false,
            scene: None,
            scene_stopped: false,
            chain_completed: false,
        }
    }

    // ─── Event view ───────────────────────────────────────────────────────────

    /// Returns the conversation identity (the sender of the event).
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Returns the normalized text, if the event carries any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns the raw event.
    pub fn event(&self) -> &InboundEvent {
        &self.event
    }

    /// Returns a shared handle to the raw event.
    pub fn event_arc(&self) -> Arc<InboundEvent> {
        Arc::clone(&self.event)
    }

    pub fn images(&self) -> &[MediaAttachment] {
        &self.images
    }

    pub fn documents(&self) -> &[MediaAttachment] {
        &self.documents
    }

    pub fn audio(&self) -> &[MediaAttachment] {
        &self.audio
    }

    pub fn video(&self) -> &[MediaAttachment] {
        &self.video
    }

    /// Returns image and document attachments, images first.
    pub fn attachments(&self) -> Vec<&MediaAttachment> {
        self.images.iter().chain(self.documents.iter()).collect()
    }

    /// Returns the sender used for replies.
    pub fn sender(&self) -> &BoxedSender {
        &self.sender
    }

    // ─── Session ──────────────────────────────────────────────────────────────

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Replaces the session, returning the previous one.
    pub fn replace_session(&mut self, session: Session) -> Session {
        std::mem::replace(&mut self.session, session)
    }

    // ─── Handled flag ─────────────────────────────────────────────────────────

    /// Returns `true` once any handler, matcher or reply has claimed the event.
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// Claims the event. There is no way to unset it.
    pub fn mark_handled(&mut self) {
        self.handled = true;
    }

    // ─── Scenes ───────────────────────────────────────────────────────────────

    /// Returns the scene the conversation is currently in.
    pub fn scene(&self) -> Option<&Arc<Scene>> {
        self.scene.as_ref()
    }

    pub(crate) fn set_scene(&mut self, scene: Option<Arc<Scene>>) {
        self.scene = scene;
    }

    /// Returns `true` if a scene was left during this dispatch.
    pub fn is_scene_stopped(&self) -> bool {
        self.scene_stopped
    }

    /// Leaves the current scene.
    ///
    /// This wipes the **whole** session, not only the scene keys: anything a
    /// handler stored before entering the scene is gone afterwards.
    pub fn leave_scene(&mut self) {
        if let Some(scene) = self.scene.take() {
            trace!(scene = %scene.name(), chat_id = %self.chat_id, "Leaving scene");
        }
        self.session.clear();
        self.scene_stopped = true;
    }

    // ─── Chain bookkeeping ────────────────────────────────────────────────────

    pub(crate) fn complete_chain(&mut self) {
        self.chain_completed = true;
    }

    /// Returns `true` if the middleware chain ran to its end for this event.
    pub fn is_chain_completed(&self) -> bool {
        self.chain_completed
    }

    // ─── Replies ──────────────────────────────────────────────────────────────

    /// Replies with text or a structured payload.
    pub async fn reply(&mut self, message: impl Into<OutgoingMessage>) -> SendResult {
        self.deliver(message.into()).await
    }

    /// Replies with an image by URL.
    ///
    /// Fields of `extra` are merged over the image payload (shallow, `extra`
    /// wins), e.g. to attach interactive elements.
    pub async fn reply_with_photo(
        &mut self,
        url: impl Into<String>,
        extra: Option<Map<String, Value>>,
    ) -> SendResult {
        let mut message = OutgoingMessage::media(MediaKind::Image, url);
        if let Some(extra) = extra {
            message = message.merge(extra);
        }
        self.deliver(message).await
    }

    /// Replies with a document by URL.
    pub async fn reply_with_document(&mut self, url: impl Into<String>) -> SendResult {
        self.deliver(OutgoingMessage::media(MediaKind::Document, url))
            .await
    }

    /// Replies with an audio file by URL.
    pub async fn reply_with_audio(&mut self, url: impl Into<String>) -> SendResult {
        self.deliver(OutgoingMessage::media(MediaKind::Audio, url))
            .await
    }

    /// Replies with a video by URL.
    pub async fn reply_with_video(&mut self, url: impl Into<String>) -> SendResult {
        self.deliver(OutgoingMessage::media(MediaKind::Video, url))
            .await
    }

    async fn deliver(&mut self, message: OutgoingMessage) -> SendResult {
        self.handled = true;
        self.sender.send_message(&self.chat_id, message).await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("chat_id", &self.chat_id)
            .field("text", &self.text)
            .field("event_type", &self.event.kind)
            .field("handled", &self.handled)
            .field("scene", &self.scene.as_ref().map(|s| s.name()))
            .finish_non_exhaustive()
    }
}
