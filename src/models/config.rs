//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Audit API client settings
    #[serde(default)]
    pub audit: AuditConfig,

    /// Storage location settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Default query behavior
    #[serde(default)]
    pub query: QueryOptions,

    /// Retention/cleanup settings
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.audit.endpoint.trim().is_empty() {
            return Err(AppError::validation("audit.endpoint is empty"));
        }
        if self.audit.timeout_secs == 0 {
            return Err(AppError::validation("audit.timeout_secs must be > 0"));
        }
        if self.audit.user_agent.trim().is_empty() {
            return Err(AppError::validation("audit.user_agent is empty"));
        }
        if self.audit.categories.is_empty() {
            return Err(AppError::validation("audit.categories is empty"));
        }
        if self.query.max_results == 0 {
            return Err(AppError::validation("query.max_results must be > 0"));
        }
        if self.retention.max_age_days == 0 {
            return Err(AppError::validation("retention.max_age_days must be > 0"));
        }
        Ok(())
    }
}

/// Audit API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Measurement API endpoint
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    /// Optional API key passed as the `key` query parameter
    #[serde(default)]
    pub api_key: Option<String>,

    /// Categories requested from the audit API
    #[serde(default = "defaults::categories")]
    pub categories: Vec<String>,

    /// Device strategy ("mobile" or "desktop")
    #[serde(default = "defaults::strategy")]
    pub strategy: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            api_key: None,
            categories: defaults::categories(),
            strategy: defaults::strategy(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Storage location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the local document/blob stores
    #[serde(default = "defaults::storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: defaults::storage_root(),
        }
    }
}

/// Per-query options with documented per-field defaults.
///
/// Partial overrides fill unspecified fields from these defaults
/// (struct-update syntax over `QueryOptions::default()`), never by
/// replacing the whole object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Maximum number of runs fetched per URL (default 10)
    #[serde(default = "defaults::max_results")]
    pub max_results: usize,

    /// Whether read paths may consult and repopulate the cache (default true)
    #[serde(default = "defaults::use_cache")]
    pub use_cache: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_results: defaults::max_results(),
            use_cache: defaults::use_cache(),
        }
    }
}

impl QueryOptions {
    /// Options with caching disabled, other fields at their defaults.
    pub fn no_cache() -> Self {
        Self {
            use_cache: false,
            ..Self::default()
        }
    }
}

/// Retention/cleanup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// URLs unseen for longer than this many days are purged
    #[serde(default = "defaults::max_age_days")]
    pub max_age_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: defaults::max_age_days(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Audit defaults
    pub fn endpoint() -> String {
        "https://www.googleapis.com/pagespeedonline/v5/runPagespeed".into()
    }
    pub fn categories() -> Vec<String> {
        vec![
            "performance".into(),
            "accessibility".into(),
            "best-practices".into(),
            "seo".into(),
        ]
    }
    pub fn strategy() -> String {
        "mobile".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; lightkeeper/0.1)".into()
    }

    // Storage defaults
    pub fn storage_root() -> PathBuf {
        PathBuf::from("storage")
    }

    // Query defaults
    pub fn max_results() -> usize {
        10
    }
    pub fn use_cache() -> bool {
        true
    }

    // Retention defaults
    pub fn max_age_days() -> u32 {
        60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_endpoint() {
        let mut config = Config::default();
        config.audit.endpoint = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_results() {
        let mut config = Config::default();
        config.query.max_results = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn query_options_partial_override_keeps_defaults() {
        let opts = QueryOptions {
            max_results: 3,
            ..QueryOptions::default()
        };
        assert_eq!(opts.max_results, 3);
        assert!(opts.use_cache);

        let opts = QueryOptions::no_cache();
        assert_eq!(opts.max_results, 10);
        assert!(!opts.use_cache);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[query]\nmax_results = 5\n").unwrap();
        assert_eq!(config.query.max_results, 5);
        assert!(config.query.use_cache);
        assert_eq!(config.retention.max_age_days, 60);
    }
}
