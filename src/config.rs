//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backing file the cache is loaded from and persisted to
    pub cache_file: PathBuf,
    /// Start empty when the backing file does not exist yet
    pub create_if_missing: bool,
    /// Background persistence interval in seconds, 0 disables it
    pub persist_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_FILE` - Backing file path (default: data/cache_data.txt)
    /// - `CACHE_CREATE_IF_MISSING` - `true`/`false` (default: true)
    /// - `PERSIST_INTERVAL` - Persistence frequency in seconds (default: 0, disabled)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_file: env::var("CACHE_FILE")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_file),
            create_if_missing: env::var("CACHE_CREATE_IF_MISSING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.create_if_missing),
            persist_interval: env::var("PERSIST_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.persist_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from("data/cache_data.txt"),
            create_if_missing: true,
            persist_interval: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_file, PathBuf::from("data/cache_data.txt"));
        assert!(config.create_if_missing);
        assert_eq!(config.persist_interval, 0);
    }

    #[test]
    fn test_config_from_env() {
        // The only test touching these variables.
        env::remove_var("CACHE_FILE");
        env::remove_var("CACHE_CREATE_IF_MISSING");
        env::remove_var("PERSIST_INTERVAL");
        assert_eq!(Config::from_env(), Config::default());

        env::set_var("CACHE_FILE", "/tmp/icp_cache.txt");
        env::set_var("CACHE_CREATE_IF_MISSING", "false");
        env::set_var("PERSIST_INTERVAL", "not-a-number");
        let config = Config::from_env();
        assert_eq!(config.cache_file, PathBuf::from("/tmp/icp_cache.txt"));
        assert!(!config.create_if_missing);
        assert_eq!(config.persist_interval, 0);

        env::remove_var("CACHE_FILE");
        env::remove_var("CACHE_CREATE_IF_MISSING");
        env::remove_var("PERSIST_INTERVAL");
    }
}
