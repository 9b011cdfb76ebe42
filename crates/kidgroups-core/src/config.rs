//! Application configuration management.
//!
//! Holds the gateway URL, the project's public (anon) key and the last email
//! used to log in. Stored at `~/.config/kidgroups/config.json`; the gateway
//! settings can be overridden from the environment.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "kidgroups";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_GATEWAY_URL: &str = "KIDGROUPS_GATEWAY_URL";
pub const ENV_ANON_KEY: &str = "KIDGROUPS_ANON_KEY";
pub const ENV_EMAIL: &str = "KIDGROUPS_EMAIL";
pub const ENV_PASSWORD: &str = "KIDGROUPS_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub gateway_url: Option<String>,
    pub anon_key: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
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

    /// Environment wins over the file for the gateway settings
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_GATEWAY_URL) {
            self.gateway_url = Some(url);
        }
        if let Some(key) = non_empty(ENV_ANON_KEY) {
            self.anon_key = Some(key);
        }
    }

    /// Gateway URL and project key, or an error naming what is missing
    pub fn gateway(&self) -> Result<(&str, &str)> {
        let url = self.gateway_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!("Gateway URL not configured (set {})", ENV_GATEWAY_URL)
        })?;
        let key = self.anon_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("Gateway key not configured (set {})", ENV_ANON_KEY)
        })?;
        Ok((url, key))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the session file and logs
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
