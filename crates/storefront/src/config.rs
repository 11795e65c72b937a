//! Shop configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `ONLINE_SHOP_API_BASE_URL` - Remote catalog base URL (default: <https://fakestoreapi.com>)
//! - `ONLINE_SHOP_STORAGE_PATH` - JSON file backing the durable store (default: memory only)
//! - `ONLINE_SHOP_KEY_PREFIX` - Durable key prefix (default: online-shop)
//! - `ONLINE_SHOP_HTTP_TIMEOUT_SECS` - Catalog request timeout (default: 10)
//! - `ONLINE_SHOP_CATALOG_CACHE_TTL_SECS` - In-memory catalog cache TTL, 0 disables (default: 300)
//! - `ONLINE_SHOP_SYNC_ALL_SLICES` - Also reload cart and clients on foreign changes (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::storage::StorageKeys;

const DEFAULT_API_BASE_URL: &str = "https://fakestoreapi.com";
const DEFAULT_HTTP_TIMEOUT_SECS: &str = "10";
const DEFAULT_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Shop configuration.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Remote catalog configuration
    pub catalog: CatalogConfig,
    /// File backing the durable store; `None` keeps it in memory
    pub storage_path: Option<PathBuf>,
    /// Prefix for durable record keys
    pub key_prefix: String,
    /// Reload cart and client slices on foreign changes, not just products
    pub sync_all_slices: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Remote catalog configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL, e.g. `https://fakestoreapi.com`
    pub base_url: Url,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// In-memory response cache TTL; zero disables the cache
    pub cache_ttl: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE_URL)
                .unwrap_or_else(|_| unreachable!("default base URL is valid")),
            request_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            storage_path: None,
            key_prefix: StorageKeys::DEFAULT_PREFIX.to_string(),
            sync_all_slices: false,
            sentry_dsn: None,
        }
    }
}

impl ShopConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let base_url = Url::parse(&vars.or_default("ONLINE_SHOP_API_BASE_URL", DEFAULT_API_BASE_URL))
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ONLINE_SHOP_API_BASE_URL".to_string(), e.to_string())
            })?;
        let request_timeout =
            vars.seconds("ONLINE_SHOP_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "ONLINE_SHOP_HTTP_TIMEOUT_SECS".to_string(),
                "must be at least 1 second".to_string(),
            ));
        }
        let cache_ttl = vars.seconds("ONLINE_SHOP_CATALOG_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;

        let key_prefix = vars.or_default("ONLINE_SHOP_KEY_PREFIX", StorageKeys::DEFAULT_PREFIX);
        if key_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "ONLINE_SHOP_KEY_PREFIX".to_string(),
                "cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            catalog: CatalogConfig {
                base_url,
                request_timeout,
                cache_ttl,
            },
            storage_path: vars.optional("ONLINE_SHOP_STORAGE_PATH").map(PathBuf::from),
            key_prefix,
            sync_all_slices: vars.flag("ONLINE_SHOP_SYNC_ALL_SLICES")?,
            sentry_dsn: vars.optional("SENTRY_DSN"),
        })
    }

    /// Durable record names for this configuration.
    #[must_use]
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::with_prefix(&self.key_prefix)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a whole number of seconds.
    fn seconds(&self, key: &str, default: &str) -> Result<Duration, ConfigError> {
        self.or_default(key, default)
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a boolean flag (`true/false/1/0/yes/no`), default false.
    fn flag(&self, key: &str) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(false);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ShopConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ShopConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.catalog.base_url.as_str(), "https://fakestoreapi.com/");
        assert_eq!(config.catalog.request_timeout, Duration::from_secs(10));
        assert_eq!(config.catalog.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.key_prefix, "online-shop");
        assert!(config.storage_path.is_none());
        assert!(!config.sync_all_slices);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("ONLINE_SHOP_API_BASE_URL", "http://127.0.0.1:8080"),
            ("ONLINE_SHOP_STORAGE_PATH", "/tmp/shop.json"),
            ("ONLINE_SHOP_KEY_PREFIX", "demo"),
            ("ONLINE_SHOP_HTTP_TIMEOUT_SECS", "3"),
            ("ONLINE_SHOP_CATALOG_CACHE_TTL_SECS", "0"),
            ("ONLINE_SHOP_SYNC_ALL_SLICES", "yes"),
        ])
        .unwrap();
        assert_eq!(config.catalog.base_url.port(), Some(8080));
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/shop.json")));
        assert_eq!(config.storage_keys().cart, "demo.cart");
        assert_eq!(config.catalog.request_timeout, Duration::from_secs(3));
        assert!(config.catalog.cache_ttl.is_zero());
        assert!(config.sync_all_slices);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("ONLINE_SHOP_STORAGE_PATH", "  "), ("SENTRY_DSN", "")]).unwrap();
        assert!(config.storage_path.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_url() {
        let err = load(&[("ONLINE_SHOP_API_BASE_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "ONLINE_SHOP_API_BASE_URL"));
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(load(&[("ONLINE_SHOP_HTTP_TIMEOUT_SECS", "ten")]).is_err());
        assert!(load(&[("ONLINE_SHOP_HTTP_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_invalid_flag() {
        let err = load(&[("ONLINE_SHOP_SYNC_ALL_SLICES", "maybe")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid environment variable ONLINE_SHOP_SYNC_ALL_SLICES: expected a boolean, got 'maybe'"
        );
    }
}
