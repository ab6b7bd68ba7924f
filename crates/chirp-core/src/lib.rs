//! # Chirp Core
//!
//! The core types of the Chirp bot framework.
//!
//! This crate holds everything the dispatch engine and the platform adapter
//! agree on, without depending on either of them:
//!
//! - **Event model**: the raw inbound WhatsApp message ([`InboundEvent`]) and
//!   its normalized dispatch category ([`EventCategory`])
//! - **Outbound model**: text or structured payloads ([`OutgoingMessage`]) and
//!   the delivery seam ([`MessageSender`])
//! - **Session state**: the per-conversation JSON mapping ([`Session`]) and the
//!   persistence seam ([`SessionStore`]) with in-memory and file backends
//! - **Webhook seam**: the contract between the HTTP transport and a platform
//!   adapter ([`WebhookHandler`])
//!
//! ```text
//! ┌──────────────┐  InboundEvent  ┌────────────┐  OutgoingMessage  ┌───────────────┐
//! │   Webhook    │───────────────▶│ Dispatcher │──────────────────▶│ MessageSender │
//! │  transport   │                │            │◀─────────────────▶│ SessionStore  │
//! └──────────────┘                └────────────┘      Session      └───────────────┘
//! ```

pub mod error;
pub mod event;
pub mod message;
pub mod sender;
pub mod session;
pub mod store;
pub mod webhook;

pub use error::{SendError, StoreError, StoreResult};
pub use event::{
    ButtonContent, ButtonReply, EventCategory, InboundEvent, InteractiveContent, MediaAttachment,
    TextContent,
};
pub use message::{MediaKind, OutgoingMessage};
pub use sender::{BoxedSender, Delivery, MessageSender, SendResult};
pub use session::{SCENE_KEY, STEP_KEY, Session};
pub use store::{
    BoxedSessionStore, DEFAULT_SESSION_FILE, FileSessionStore, MemorySessionStore, SessionStore,
};
pub use webhook::{BoxedWebhookHandler, WebhookHandler, WebhookOutcome};
