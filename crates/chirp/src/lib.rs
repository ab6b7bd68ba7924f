//! # Chirp
//!
//! A WhatsApp bot framework for Rust.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐    ┌─────────────────────────────────────────────────────┐
//! │  Webhook  │───▶│ Dispatcher                                          │
//! │ (axum)    │    │  lock conversation → load session                   │
//! └───────────┘    │  → middleware chain (logger, scenes, your own, ...) │
//!                  │  → handlers for the event category, first match     │
//!                  │  → save session                                     │
//!                  └──────────────────────────┬──────────────────────────┘
//!                                             │ ctx.reply(...)
//!                                             ▼
//!                                     WhatsApp Cloud API
//! ```
//!
//! - **Runtime**: loads `chirp.toml`, sets up logging, serves the webhook
//! - **Dispatcher**: runs middleware and routes events to handlers
//! - **Scenes**: multi-step conversations that take over a chat until done
//! - **Adapter**: Cloud API delivery, webhook parsing, reply keyboards
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chirp::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = ChirpRuntime::builder().build().await?;
//!
//!     runtime
//!         .dispatcher_mut()
//!         .use_boxed_middleware(logger())
//!         .command("/start", |ctx| Box::pin(async move {
//!             ctx.reply("Welcome").await?;
//!             Ok(())
//!         }))
//!         .hears(["hi", "hello"], |ctx| Box::pin(async move {
//!             ctx.reply("Hello!").await?;
//!             Ok(())
//!         }));
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `json-log`: JSON log output

pub use chirp_adapter_whatsapp as whatsapp;
pub use chirp_core as core;
pub use chirp_framework as framework;
pub use chirp_runtime as runtime;
pub use chirp_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use chirp::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use chirp_runtime::{ChirpConfig, ChirpRuntime};

    // Dispatch engine
    pub use chirp_framework::prelude::*;
    pub use chirp_framework::{Commands, Matcher};

    // Event and session types seen inside handlers
    pub use chirp_core::{EventCategory, InboundEvent, OutgoingMessage, Session};

    // Reply keyboards
    pub use chirp_adapter_whatsapp::{Button, Markup};
}
