//! # Chirp Transport
//!
//! The HTTP side of the Chirp bot framework: an axum server that exposes a
//! [`WebhookHandler`](chirp_core::WebhookHandler) at a single path.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Adapter (WhatsApp)  │  implements WebhookHandler
//! ├──────────────────────┤
//! │  chirp-core          │  WebhookHandler / WebhookOutcome
//! ├──────────────────────┤
//! │  chirp-transport     │  <- This crate (axum routes, lifecycle)
//! ├──────────────────────┤
//! │  Network (TCP/HTTP)  │
//! └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chirp_transport::WebhookServer;
//!
//! let server = WebhookServer::bind("0.0.0.0:3000", "/webhook", handler).await?;
//! let handle = server.spawn();
//! // ...
//! handle.shutdown().await?;
//! ```

pub mod error;
pub mod server;

pub use error::{TransportError, TransportResult};
pub use server::{DEFAULT_WEBHOOK_PATH, ServerHandle, WebhookServer, router};
pub use tokio_util::sync::CancellationToken;
