//! Configuration for the WhatsApp Cloud API adapter.
//!
//! Loaded from the `whatsapp` section of `chirp.toml`:
//!
//! ```toml
//! [whatsapp]
//! access_token = "EAAG..."
//! phone_number_id = "1234567890"
//! verify_token = "my-verify-token"
//! api_version = "v23.0"
//! ```
//!
//! Credentials are usually better supplied through the environment:
//! `CHIRP_WHATSAPP__ACCESS_TOKEN`, `CHIRP_WHATSAPP__PHONE_NUMBER_ID`,
//! `CHIRP_WHATSAPP__VERIFY_TOKEN`.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::WhatsAppConfigError;

/// Default Graph API version.
pub const DEFAULT_API_VERSION: &str = "v23.0";

/// Default Graph API host.
pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";

/// WhatsApp Cloud API adapter configuration.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Cloud API access token, sent as a bearer token.
    pub access_token: String,

    /// The business phone number id messages are sent from.
    #[serde(deserialize_with = "string_or_number")]
    pub phone_number_id: String,

    /// Token the platform echoes during webhook subscription.
    #[serde(deserialize_with = "string_or_number")]
    pub verify_token: String,

    /// Graph API version segment.
    pub api_version: String,

    /// Graph API host, overridable for testing.
    pub base_url: String,

    /// Outbound request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            verify_token: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl WhatsAppConfig {
    /// Creates a configuration with the three required credentials.
    pub fn new(
        access_token: impl Into<String>,
        phone_number_id: impl Into<String>,
        verify_token: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
            verify_token: verify_token.into(),
            ..Self::default()
        }
    }

    /// Overrides the API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the API version.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Checks that every credential is present and the base URL is usable.
    pub fn validate(&self) -> Result<(), WhatsAppConfigError> {
        let missing: Vec<&'static str> = [
            ("access_token", &self.access_token),
            ("phone_number_id", &self.phone_number_id),
            ("verify_token", &self.verify_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(WhatsAppConfigError::MissingCredentials(missing));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(WhatsAppConfigError::InvalidBaseUrl(self.base_url.clone()));
        }

        Ok(())
    }

    /// Returns the message send endpoint.
    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url.trim_end_matches('/'),
            self.api_version,
            self.phone_number_id
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("access_token", &redact(&self.access_token))
            .field("phone_number_id", &self.phone_number_id)
            .field("verify_token", &redact(&self.verify_token))
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Accepts ids written as bare numbers, as environment providers and TOML
/// files commonly produce them.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
    })
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WhatsAppConfig::default();
        assert_eq!(config.api_version, "v23.0");
        assert_eq!(config.base_url, "https://graph.facebook.com");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_credentials_are_listed() {
        let config = WhatsAppConfig::new("token", "", " ");
        let err = config.validate().unwrap_err();
        match err {
            WhatsAppConfigError::MissingCredentials(fields) => {
                assert_eq!(fields, vec!["phone_number_id", "verify_token"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_messages_url() {
        let config = WhatsAppConfig::new("t", "42", "v").with_base_url("http://localhost:1234/");
        config.validate().unwrap();
        assert_eq!(
            config.messages_url(),
            "http://localhost:1234/v23.0/42/messages"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = WhatsAppConfig::new("t", "42", "v").with_base_url("graph.facebook.com");
        assert!(matches!(
            config.validate(),
            Err(WhatsAppConfigError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = WhatsAppConfig::new("super-secret", "42", "hush");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("hush"));
        assert!(rendered.contains("42"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: WhatsAppConfig = serde_json::from_str(
            r#"{ "access_token": "a", "phone_number_id": "b", "verify_token": "c" }"#,
        )
        .unwrap();
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        config.validate().unwrap();
    }

    #[test]
    fn test_numeric_phone_number_id() {
        let config: WhatsAppConfig =
            serde_json::from_str(r#"{ "phone_number_id": 1234567890 }"#).unwrap();
        assert_eq!(config.phone_number_id, "1234567890");
    }
}
