//! Cart engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LOOMWAY_API_BASE_URL` - Base URL of the Loomway marketplace API
//!
//! ## Optional
//! - `LOOMWAY_API_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `LOOMWAY_CACHE_DIR` - Directory for the persisted cart cache; when
//!   absent the cart falls back to in-memory persistence
//!
//! The configuration only covers app wiring. The store itself takes all of
//! its collaborators by injection and never reads the environment; tests
//! build a [`CartConfig`] directly.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart engine configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Base URL of the marketplace API, e.g. `https://api.loomway.dev`
    pub api_base_url: Url,
    /// Per-request timeout for cart API calls
    pub request_timeout: Duration,
    /// Directory for the persisted cart cache; `None` means in-memory only
    pub cache_dir: Option<PathBuf>,
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("LOOMWAY_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("LOOMWAY_API_BASE_URL".to_string(), e.to_string())
            })?;

        let timeout_secs = get_env_or_default(
            "LOOMWAY_API_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("LOOMWAY_API_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        let cache_dir = get_optional_env("LOOMWAY_CACHE_DIR").map(PathBuf::from);

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            cache_dir,
        })
    }

    /// Build a config for a given base URL with default timeout and no cache
    /// directory. Used by tests and by hosts that wire everything manually.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL does not parse.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let api_base_url = base_url.parse::<Url>().map_err(|e| {
            ConfigError::InvalidEnvVar("LOOMWAY_API_BASE_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_dir: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_for_base_url_defaults() {
        let config = CartConfig::for_base_url("https://api.loomway.dev").unwrap();

        assert_eq!(config.api_base_url.as_str(), "https://api.loomway.dev/");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_for_base_url_rejects_garbage() {
        let result = CartConfig::for_base_url("not a url");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("LOOMWAY_API_BASE_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: LOOMWAY_API_BASE_URL"
        );

        let err = ConfigError::InvalidEnvVar("LOOMWAY_API_TIMEOUT_SECS".to_string(), "bad".to_string());
        assert!(err.to_string().contains("LOOMWAY_API_TIMEOUT_SECS"));
    }

    #[test]
    fn test_direct_construction() {
        let config = CartConfig {
            api_base_url: "http://127.0.0.1:4000".parse().unwrap(),
            request_timeout: Duration::from_secs(2),
            cache_dir: Some(PathBuf::from("/tmp/loomway")),
        };

        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.cache_dir.as_deref(), Some(std::path::Path::new("/tmp/loomway")));
    }
}
