// Configuration management for the meshnode CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/meshnode/config.json
// - Linux: ~/.config/meshnode/config.json
// - Windows: %APPDATA%\meshnode\config.json

use anyhow::{Context, Result};
use meshnode_core::{IdentityPersistence, NodeConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage directory (identity database). Defaults to <data dir>/storage
    pub storage_path: Option<String>,

    /// Cache directory. Defaults to <cache dir>/meshnode
    pub cache_path: Option<String>,

    /// Also write logs to a daily file in the cache directory
    pub log_to_file: bool,

    /// Node settings
    pub node: NodeConfig,
}

/// Keys accepted by `config set` / `config get`
pub const KEYS: &[&str] = &[
    "storage_path",
    "cache_path",
    "log_to_file",
    "identity_persistence",
    "relaying_enabled",
];

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("meshnode");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the data directory path (cross-platform)
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to determine data directory")?
            .join("meshnode");

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(data_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Load config from `path`, creating a default file if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Resolved storage directory
    pub fn storage_dir(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::data_dir()?.join("storage")),
        }
    }

    /// Resolved cache directory
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(dirs::cache_dir()
                .context("Failed to determine cache directory")?
                .join("meshnode")),
        }
    }

    /// Set a config value (in memory; call `save` to persist)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "storage_path" => self.storage_path = optional_path(value),
            "cache_path" => self.cache_path = optional_path(value),
            "log_to_file" => {
                self.log_to_file = value.parse().context("Invalid boolean value")?;
            }
            "identity_persistence" => {
                self.node.identity_persistence = match value {
                    "persistent" => IdentityPersistence::Persistent,
                    "ephemeral" => IdentityPersistence::Ephemeral,
                    _ => anyhow::bail!("Expected 'persistent' or 'ephemeral', got {}", value),
                };
            }
            "relaying_enabled" => {
                self.node.relaying_enabled = value.parse().context("Invalid boolean value")?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "storage_path" => self.storage_path.clone(),
            "cache_path" => self.cache_path.clone(),
            "log_to_file" => Some(self.log_to_file.to_string()),
            "identity_persistence" => Some(
                match self.node.identity_persistence {
                    IdentityPersistence::Persistent => "persistent",
                    IdentityPersistence::Ephemeral => "ephemeral",
                }
                .to_string(),
            ),
            "relaying_enabled" => Some(self.node.relaying_enabled.to_string()),
            _ => None,
        }
    }

    /// All set values as (key, value) pairs
    pub fn list(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }
}

fn optional_path(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
