//! Minting Configuration
//!
//! Defines the configuration passed to the minting client:
//! - API credential and target collection
//! - Environment (staging vs production) selection
//! - Request timeout

use crate::error::ConfigError;
use std::time::Duration;

/// Minting API version path segment
pub const API_VERSION: &str = "2022-06-09";

/// Default chain used to qualify bare wallet addresses
pub const DEFAULT_CHAIN: &str = "polygon";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Target environment of the minting API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    /// Staging keys carry a `staging` marker; everything else is production.
    pub fn from_api_key(api_key: &str) -> Self {
        if api_key.contains("staging") {
            Self::Staging
        } else {
            Self::Production
        }
    }

    pub fn base_url(&self) -> String {
        match self {
            Self::Staging => format!("https://staging.crossmint.com/api/{}", API_VERSION),
            Self::Production => format!("https://www.crossmint.com/api/{}", API_VERSION),
        }
    }
}

/// Complete minting client configuration
#[derive(Clone)]
pub struct MintConfig {
    /// API credential sent with every request
    pub api_key: String,
    /// Collection the NFTs are minted into
    pub collection_id: String,
    /// Environment derived from the credential
    pub environment: Environment,
    /// Explicit base URL, overrides the environment's
    pub base_url_override: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl MintConfig {
    /// Validate and build a configuration. Blank values count as missing.
    pub fn new(
        api_key: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into().trim().to_string();
        let collection_id = collection_id.into().trim().to_string();

        if api_key.is_empty() {
            return Err(ConfigError::Missing("API key"));
        }
        if collection_id.is_empty() {
            return Err(ConfigError::Missing("collection id"));
        }

        Ok(Self {
            environment: Environment::from_api_key(&api_key),
            api_key,
            collection_id,
            base_url_override: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url_override = (!base_url.trim().is_empty()).then_some(base_url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL requests are sent to, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.base_url_override {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => self.environment.base_url(),
        }
    }
}

// Keep the credential out of logs
impl std::fmt::Debug for MintConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintConfig")
            .field("api_key", &"<redacted>")
            .field("collection_id", &self.collection_id)
            .field("environment", &self.environment)
            .field("base_url_override", &self.base_url_override)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_api_key() {
        assert_eq!(
            Environment::from_api_key("sk_staging_123"),
            Environment::Staging
        );
        assert_eq!(
            Environment::from_api_key("sk_production_123"),
            Environment::Production
        );
    }

    #[test]
    fn test_base_url_selection() {
        let staging = MintConfig::new("sk_staging_abc", "col").unwrap();
        assert!(staging.base_url().starts_with("https://staging.crossmint.com"));

        let prod = MintConfig::new("sk_production_abc", "col").unwrap();
        assert!(prod.base_url().starts_with("https://www.crossmint.com"));

        let custom = prod.with_base_url("http://127.0.0.1:9000/");
        assert_eq!(custom.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_blank_base_url_is_ignored() {
        let config = MintConfig::new("k", "c").unwrap().with_base_url("  ");
        assert!(config.base_url_override.is_none());
    }

    #[test]
    fn test_missing_values_rejected() {
        assert!(matches!(
            MintConfig::new("", "col"),
            Err(ConfigError::Missing("API key"))
        ));
        assert!(matches!(
            MintConfig::new("key", "   "),
            Err(ConfigError::Missing("collection id"))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = MintConfig::new("sk_production_secret", "col").unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }
}
