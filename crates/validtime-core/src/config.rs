use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::accumulator::DEFAULT_STORAGE_KEY;
use crate::session::DEFAULT_INTERVAL_MS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("erreur de lecture: {source}")]
    Read {
        #[from]
        source: std::io::Error,
    },

    #[error("erreur de parsing TOML: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub storage: StorageConfig,
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub interval_ms: u64,
    pub storage_key: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub instance: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            instance: "default".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn resolve_database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(|| {
            dirs::data_dir().map(|directory| directory.join("validtime").join("store.db"))
        })
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("validtime")
            .join("config.toml")
    }
}
