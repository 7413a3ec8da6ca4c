//! Configuration loading and management
//!
//! Handles parsing of `tasklink.toml`, looked up in the store directory
//! unless a path is given explicitly.

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// File name of the configuration inside a store directory
pub const CONFIG_FILE: &str = "tasklink.toml";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Page address that share links are built on
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Share link configuration
    #[serde(default)]
    pub share: ShareConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            share: ShareConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://tasklink.local/".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareConfig {
    /// Links longer than this are still published, with a warning
    #[serde(default = "default_max_url_len")]
    pub max_url_len: usize,
}

fn default_max_url_len() -> usize {
    2048
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            max_url_len: default_max_url_len(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// How long to wait for another process to release the store
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists; missing or invalid files give defaults
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Load `tasklink.toml` from a store directory, or return defaults
    pub fn load_from_store(store_dir: &Path) -> Self {
        Self::load_or_default(&store_dir.join(CONFIG_FILE))
    }

    /// Parsed page address
    pub fn base_url(&self) -> Result<url::Url> {
        Ok(url::Url::parse(&self.base_url)?)
    }

    fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.base_url)
            .map_err(|err| Error::InvalidConfig(format!("base_url: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "base_url: '{}' cannot carry a query",
                self.base_url
            )));
        }
        if base.query().is_some() {
            return Err(Error::InvalidConfig(
                "base_url must not include a query".to_string(),
            ));
        }
        if self.share.max_url_len < 64 {
            return Err(Error::InvalidConfig(
                "share.max_url_len must be >= 64".to_string(),
            ));
        }
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
