//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend location, session timing, and the last used
//! username.
//!
//! Configuration is stored at `~/.config/tokenward/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "tokenward";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Upper bound on the persisted copy's lifetime (ten years)
const MAX_STORE_TTL_HOURS: i64 = 24 * 365 * 10;

/// Environment variable overriding the backend base URL
const BASE_URL_ENV: &str = "TOKENWARD_BASE_URL";

/// Where the persisted token lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    /// Login endpoint override, e.g. a relay in front of the backend
    pub login_url: Option<String>,
    pub request_timeout_secs: u64,
    pub watch_interval_secs: u64,
    pub renewal_threshold_secs: i64,
    pub prompt_timeout_secs: u64,
    pub store_ttl_hours: i64,
    pub landing_route: String,
    pub login_route: String,
    pub token_storage: TokenStorage,
    pub last_username: Option<String>,
    pub relay_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            login_url: None,
            request_timeout_secs: 30,
            watch_interval_secs: 60,
            renewal_threshold_secs: 120,
            prompt_timeout_secs: 120,
            store_ttl_hours: 24,
            landing_route: "/dashboard".to_string(),
            login_route: "/login".to_string(),
            token_storage: TokenStorage::File,
            last_username: None,
            relay_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    /// Load from disk (defaults when absent), then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.base_url = url;
        }
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Never zero; a zero period would spin the watch
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs.max(1))
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    /// Clamped to `0..=MAX_STORE_TTL_HOURS`
    pub fn store_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.store_ttl_hours.clamp(0, MAX_STORE_TTL_HOURS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.watch_interval(), Duration::from_secs(60));
        assert_eq!(config.renewal_threshold_secs, 120);
        assert_eq!(config.store_ttl(), chrono::Duration::days(1));
        assert_eq!(config.landing_route, "/dashboard");
        assert_eq!(config.login_route, "/login");
        assert_eq!(config.token_storage, TokenStorage::File);
    }

    #[test]
    fn test_zero_watch_interval_is_clamped() {
        let config = Config {
            watch_interval_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.watch_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_store_ttl_is_clamped() {
        let huge = Config {
            store_ttl_hours: i64::MAX,
            ..Config::default()
        };
        assert_eq!(huge.store_ttl(), chrono::Duration::hours(MAX_STORE_TTL_HOURS));

        let negative = Config {
            store_ttl_hours: -5,
            ..Config::default()
        };
        assert_eq!(negative.store_ttl(), chrono::Duration::zero());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"base_url":"https://auth.example.com","token_storage":"keyring"}"#)
                .expect("config should parse");
        assert_eq!(config.base_url, "https://auth.example.com");
        assert_eq!(config.token_storage, TokenStorage::Keyring);
        assert_eq!(config.watch_interval_secs, 60);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = Config {
            last_username: Some("front-desk".to_string()),
            ..Config::default()
        };
        config.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.last_username.as_deref(), Some("front-desk"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = Config::load_from(&dir.path().join("absent.json")).expect("load");
        assert_eq!(loaded.base_url, Config::default().base_url);
    }
}
