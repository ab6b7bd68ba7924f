//! Chirp Runtime - Orchestration layer for the Chirp bot framework.
//!
//! This crate provides:
//! - Layered configuration (`chirp.toml`, profiles, `CHIRP_*` variables)
//! - Logging setup over `tracing-subscriber`
//! - [`ChirpRuntime`], which wires the WhatsApp client, the session store
//!   and the dispatcher together and serves the webhook until shutdown
//!
//! ```rust,ignore
//! use chirp_runtime::ChirpRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = ChirpRuntime::builder().build().await?;
//!     runtime.dispatcher_mut().hears("hi", |ctx| Box::pin(async move {
//!         ctx.reply("Hello!").await?;
//!         Ok(())
//!     }));
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ChirpConfig, ConfigError, ConfigLoader, ConfigResult};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ChirpRuntime, RuntimeBuilder};

// Re-export tracing for use by bot crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for bot code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
