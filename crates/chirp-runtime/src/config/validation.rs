//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ChirpConfig, LogOutput, ServerConfig, SessionBackend, SessionConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ChirpConfig) -> ConfigResult<()> {
    config.whatsapp.validate()?;
    validate_server_config(&config.server)?;
    validate_session_config(&config.session)?;

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}

fn validate_server_config(server: &ServerConfig) -> ConfigResult<()> {
    if server.host.trim().is_empty() {
        return Err(ConfigError::missing_field("server.host"));
    }
    if server.port == 0 {
        return Err(ConfigError::InvalidPort(server.port));
    }
    if server.path.trim().is_empty() {
        return Err(ConfigError::validation("server.path must not be empty"));
    }
    if server.path.contains(char::is_whitespace) {
        return Err(ConfigError::validation(
            "server.path must not contain whitespace",
        ));
    }
    Ok(())
}

fn validate_session_config(session: &SessionConfig) -> ConfigResult<()> {
    if session.backend == SessionBackend::File && session.file_path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("session.file_path"));
    }
    Ok(())
}
