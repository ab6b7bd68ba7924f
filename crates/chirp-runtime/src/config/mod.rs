//! Configuration module for the Chirp runtime.
//!
//! This module provides TOML and environment based configuration loading
//! and validation for the WhatsApp adapter, the webhook server, session
//! storage, dispatch and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ChirpConfig, DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, ServerConfig,
    SessionBackend, SessionConfig, SpanEventConfig,
};
pub use validation::validate_config;
