//! Client configuration for the offline-aware sync layer.
//!
//! Provides a `ClientConfig` struct shared by every host (CLI, apps) to point
//! the core at a backend and tune retry and auto-sync behavior.

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

/// Replay attempts a queued mutation gets before it is dropped.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backend endpoint and sync tuning.
///
/// Access tokens are per-user credentials; hosts should keep them out of
/// shipped configuration files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            access_token: None,
            max_retries: DEFAULT_MAX_RETRIES,
            auto_sync: true,
            request_timeout_secs: None,
        }
    }

    /// Parse and validate a JSON configuration payload.
    pub fn parse(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)?;
        config.normalized()
    }

    /// Trim text fields, blank out empty options, and validate the result.
    pub fn normalized(self) -> Result<Self> {
        let Some(api_base_url) = normalize_text_option(Some(self.api_base_url)) else {
            return Err(Error::InvalidInput(
                "config field 'api_base_url' is required".to_string(),
            ));
        };
        if !is_http_url(&api_base_url) {
            return Err(Error::InvalidInput(
                "config field 'api_base_url' must include http:// or https://".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(Error::InvalidInput(
                "config field 'max_retries' must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(Error::InvalidInput(
                "config field 'request_timeout_secs' must be positive".to_string(),
            ));
        }

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            access_token: normalize_text_option(self.access_token),
            ..self
        })
    }
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_auto_sync() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_applies_defaults() {
        let config = ClientConfig::parse(r#"{"api_base_url":"https://api.example.com/"}"#).unwrap();
        assert_eq!(config, ClientConfig::new("https://api.example.com"));
        assert_eq!(config.max_retries, 3);
        assert!(config.auto_sync);
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        let result = ClientConfig::parse(r#"{"api_base_url":"https://a.example","retries":2}"#);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn normalized_blanks_empty_token() {
        let config = ClientConfig {
            access_token: Some("   ".to_string()),
            ..ClientConfig::new(" http://localhost:8080 ")
        }
        .normalized()
        .unwrap();

        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.access_token, None);
    }

    #[test]
    fn normalized_rejects_invalid_values() {
        assert!(ClientConfig::new("").normalized().is_err());
        assert!(ClientConfig::new("api.example.com").normalized().is_err());

        let zero_retries = ClientConfig {
            max_retries: 0,
            ..ClientConfig::new("https://api.example.com")
        };
        let error = zero_retries.normalized().unwrap_err();
        assert!(error.to_string().contains("max_retries"));
    }
}
