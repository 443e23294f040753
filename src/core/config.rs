//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::models::ProviderKind;

/// Bearer token issuance endpoint
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://api.cognitive.microsoft.com/sts/v1.0/issueToken";

/// Translate endpoint of the token-based provider
pub const DEFAULT_TOKEN_BASED_ENDPOINT: &str =
    "http://api.microsofttranslator.com/v2/Http.svc/Translate";

/// Translate endpoint of the token-free provider
pub const DEFAULT_TOKEN_FREE_ENDPOINT: &str = "https://translate.yandex.net/api/v1.5/tr/translate";

/// Issued tokens live for ten minutes; treat them as stale a little earlier.
pub const DEFAULT_TOKEN_VALIDITY_MS: u64 = 550_000;

/// Prefix for environment overrides applied on top of a config file
const ENV_PREFIX: &str = "TRANSLATOR";

/// Provider configuration, read-only to the dispatch core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    /// Overrides `provider` with the token-free provider when set
    pub enable_token_free: bool,
    /// Subscription key for the token endpoint, or the API key of the token-free provider
    pub subscription_key: String,
    pub source_lang: String,
    pub target_lang: String,
    pub fallback_delay_ms: u64,
    pub token_endpoint: String,
    pub token_based_endpoint: String,
    pub token_free_endpoint: String,
    pub token_validity_ms: u64,
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::TokenBased,
            enable_token_free: false,
            subscription_key: std::env::var("SUBSCRIPTION_KEY").unwrap_or_default(),
            source_lang: "en".to_string(),
            target_lang: "zh".to_string(),
            fallback_delay_ms: 500,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            token_based_endpoint: DEFAULT_TOKEN_BASED_ENDPOINT.to_string(),
            token_free_endpoint: DEFAULT_TOKEN_FREE_ENDPOINT.to_string(),
            token_validity_ms: DEFAULT_TOKEN_VALIDITY_MS,
            timeout_ms: 30000,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl ProviderConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let subscription_key = std::env::var("SUBSCRIPTION_KEY")
            .map_err(|_| anyhow::anyhow!("SUBSCRIPTION_KEY environment variable is required"))?;

        let source_lang = std::env::var("SOURCE_LANG").unwrap_or(defaults.source_lang);
        let target_lang = std::env::var("TARGET_LANG").unwrap_or(defaults.target_lang);

        let fallback_delay_ms = std::env::var("FALLBACK_DELAY_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse::<u64>()?;

        let token_validity_ms = std::env::var("TOKEN_VALIDITY_MS")
            .unwrap_or_else(|_| DEFAULT_TOKEN_VALIDITY_MS.to_string())
            .parse::<u64>()?;

        let timeout_ms = std::env::var("REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse::<u64>()?;

        Ok(Self {
            provider: defaults.provider,
            enable_token_free: env_flag("ENABLE_TOKEN_FREE"),
            subscription_key,
            source_lang,
            target_lang,
            fallback_delay_ms,
            token_endpoint: std::env::var("TOKEN_ENDPOINT").unwrap_or(defaults.token_endpoint),
            token_based_endpoint: std::env::var("TOKEN_BASED_ENDPOINT")
                .unwrap_or(defaults.token_based_endpoint),
            token_free_endpoint: std::env::var("TOKEN_FREE_ENDPOINT")
                .unwrap_or(defaults.token_free_endpoint),
            token_validity_ms,
            timeout_ms,
        })
    }

    /// Load from a config file (json, yaml or toml by extension), with
    /// `TRANSLATOR_*` environment variables layered on top
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config: Self = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        info!("Loaded provider configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.subscription_key.is_empty() {
            return Err(anyhow::anyhow!("Subscription key is required"));
        }

        if self.source_lang.is_empty() || self.target_lang.is_empty() {
            return Err(anyhow::anyhow!("Source and target language are required"));
        }

        let endpoint = match self.effective_provider() {
            ProviderKind::TokenBased => &self.token_based_endpoint,
            ProviderKind::TokenFree => &self.token_free_endpoint,
        };
        if endpoint.is_empty() {
            return Err(anyhow::anyhow!("Translate endpoint is required"));
        }

        if self.effective_provider() == ProviderKind::TokenBased {
            if self.token_endpoint.is_empty() {
                return Err(anyhow::anyhow!("Token endpoint is required"));
            }
            if self.token_validity_ms == 0 {
                return Err(anyhow::anyhow!("token_validity_ms must be greater than 0"));
            }
        }

        if self.source_lang == self.target_lang {
            warn!("Source and target language are both {}", self.source_lang);
        }

        Ok(())
    }

    /// Provider actually used for dispatch
    pub fn effective_provider(&self) -> ProviderKind {
        if self.enable_token_free {
            ProviderKind::TokenFree
        } else {
            self.provider
        }
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn token_validity(&self) -> Duration {
        Duration::from_millis(self.token_validity_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_include;
    use std::io::Write;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            subscription_key: "test_key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_missing_key() {
        let config = ProviderConfig {
            subscription_key: "".to_string(),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_window() {
        let config = ProviderConfig {
            token_validity_ms: 0,
            ..test_config()
        };
        assert!(config.validate().is_err());

        // the window is irrelevant once the token-free provider is selected
        let config = ProviderConfig {
            enable_token_free: true,
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_provider() {
        let mut config = test_config();
        assert_eq!(config.effective_provider(), ProviderKind::TokenBased);

        config.enable_token_free = true;
        assert_eq!(config.effective_provider(), ProviderKind::TokenFree);

        config.enable_token_free = false;
        config.provider = ProviderKind::TokenFree;
        assert_eq!(config.effective_provider(), ProviderKind::TokenFree);
    }

    #[test]
    fn test_default_window_shorter_than_token_lifetime() {
        let config = test_config();
        assert!(config.token_validity() < Duration::from_secs(600));
        assert_eq!(config.fallback_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_from_file_partial_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"subscription_key": "abc", "target_lang": "de", "enable_token_free": true}}"#
        )
        .unwrap();

        let config = ProviderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.subscription_key, "abc");
        assert_eq!(config.target_lang, "de");
        assert!(config.enable_token_free);
        assert_eq!(config.source_lang, "en");
        assert_eq!(config.token_validity_ms, DEFAULT_TOKEN_VALIDITY_MS);
    }

    #[test]
    fn test_to_file_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provider.json");
        let config = ProviderConfig {
            target_lang: "fr".to_string(),
            ..test_config()
        };
        config.to_file(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_json_include!(
            actual: written,
            expected: serde_json::json!({
                "provider": "token_based",
                "subscription_key": "test_key",
                "target_lang": "fr",
                "token_validity_ms": 550000
            })
        );

        let reloaded = ProviderConfig::from_file(&path).unwrap();
        assert_eq!(reloaded.target_lang, "fr");
    }
}
