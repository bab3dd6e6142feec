//! # Router Configuration Module
//!
//! Settings for the route cache and logging, loaded from environment variables
//! or a TOML file.
//!
//! ## Environment Variables
//!
//! ### `ROUTEWEAVE_CACHE`
//!
//! `on` / `off` (also `true`/`false`, `1`/`0`). Default: `off`.
//!
//! ### `ROUTEWEAVE_CACHE_PATH`
//!
//! Location of the compiled route table. Default: `routeweave-routes.json` in
//! the system temp directory.
//!
//! ### `ROUTEWEAVE_CACHE_TTL`
//!
//! Record lifetime in seconds. Default: `3600`.
//!
//! ### `ROUTEWEAVE_LOG_FORMAT`
//!
//! `pretty` or `json`. Default: `pretty`.
//!
//! ## TOML
//!
//! ```toml
//! cache_enabled = true
//! cache_path = "/var/cache/app/routes.json"
//! cache_ttl_secs = 600
//! log_format = "json"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::{RouteCache, DEFAULT_CACHE_TTL};
use crate::logging::LogFormat;

/// Router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    pub cache_enabled: bool,
    pub cache_path: PathBuf,
    pub cache_ttl_secs: u64,
    pub log_format: LogFormat,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cache_enabled: false,
            cache_path: env::temp_dir().join("routeweave-routes.json"),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables
    ///
    /// Unparseable values are logged and replaced by the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Override fields with any `ROUTEWEAVE_*` variables that are set
    #[must_use]
    pub fn merge_env(mut self) -> Self {
        if let Ok(val) = env::var("ROUTEWEAVE_CACHE") {
            match parse_switch(&val) {
                Some(enabled) => self.cache_enabled = enabled,
                None => warn!(value = %val, "Ignoring invalid ROUTEWEAVE_CACHE"),
            }
        }
        if let Ok(val) = env::var("ROUTEWEAVE_CACHE_PATH") {
            if !val.trim().is_empty() {
                self.cache_path = PathBuf::from(val);
            }
        }
        if let Ok(val) = env::var("ROUTEWEAVE_CACHE_TTL") {
            match val.trim().parse() {
                Ok(secs) => self.cache_ttl_secs = secs,
                Err(_) => warn!(value = %val, "Ignoring invalid ROUTEWEAVE_CACHE_TTL"),
            }
        }
        if let Ok(val) = env::var("ROUTEWEAVE_LOG_FORMAT") {
            self.log_format = LogFormat::parse(&val);
        }
        self
    }

    /// Parse a TOML document; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error for invalid TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid router configuration")
    }

    /// Read a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in config {}", path.display()))
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// The route cache, when enabled
    #[must_use]
    pub fn build_cache(&self) -> Option<RouteCache> {
        self.cache_enabled
            .then(|| RouteCache::new(&self.cache_path, self.cache_ttl()))
    }
}

fn parse_switch(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert!(!config.cache_enabled);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert!(config.build_cache().is_none());
    }

    #[test]
    fn test_from_toml_str() {
        let config = RouterConfig::from_toml_str(
            r#"
cache_enabled = true
cache_path = "/tmp/routes.json"
cache_ttl_secs = 60
log_format = "json"
"#,
        )
        .unwrap();
        assert!(config.cache_enabled);
        assert_eq!(config.cache_path, PathBuf::from("/tmp/routes.json"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.log_format, LogFormat::Json);

        let cache = config.build_cache().unwrap();
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RouterConfig::from_toml_str("cache_ttl_secs = 5").unwrap();
        assert!(!config.cache_enabled);
        assert_eq!(config.cache_ttl_secs, 5);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(RouterConfig::from_toml_str("cache_size = 5").is_err());
    }

    #[test]
    fn test_parse_switch() {
        assert_eq!(parse_switch(" ON "), Some(true));
        assert_eq!(parse_switch("off"), Some(false));
        assert_eq!(parse_switch("maybe"), None);
    }
}
