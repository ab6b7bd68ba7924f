//! # Chirp Adapter for the WhatsApp Cloud API
//!
//! This crate connects the Chirp dispatch engine to WhatsApp:
//!
//! - [`CloudApiClient`] delivers replies through the Graph API
//! - [`WhatsAppWebhook`] verifies webhook subscriptions and turns
//!   notifications into dispatched events
//! - [`Markup`] builds reply-button keyboards
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chirp_adapter_whatsapp::{CloudApiClient, WhatsAppConfig, WhatsAppWebhook};
//! use chirp_framework::Dispatcher;
//!
//! let config = WhatsAppConfig::new(token, phone_number_id, verify_token);
//! let client = Arc::new(CloudApiClient::new(&config)?);
//!
//! let mut dispatcher = Dispatcher::new(client);
//! dispatcher.command("/start", |ctx| Box::pin(async move {
//!     ctx.reply("Welcome").await?;
//!     Ok(())
//! }));
//!
//! let webhook = WhatsAppWebhook::new(Arc::new(dispatcher), config.verify_token.clone());
//! // hand `webhook` to the HTTP transport
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod markup;
pub mod webhook;

pub use client::CloudApiClient;
pub use config::{DEFAULT_API_VERSION, DEFAULT_BASE_URL, WhatsAppConfig};
pub use error::{MarkupError, WhatsAppConfigError};
pub use markup::{Button, Keyboard, MAX_REPLY_BUTTONS, Markup};
pub use webhook::{
    BUSINESS_ACCOUNT_OBJECT, ChangeValue, WebhookChange, WebhookEntry, WebhookPayload,
    WhatsAppWebhook, verify_subscription,
};
