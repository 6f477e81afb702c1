//! Engine configuration
//!
//! Layered TOML: an explicit path wins, then `~/.engram/config.toml`,
//! then the platform config directory, then built-in defaults. Every
//! section and field is optional; partial files override only what they
//! name.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::bridge::BridgeConfig;
use crate::curator::consolidate::ConsolidationConfig;
use crate::error::{EngramError, Result};
use crate::memory::importance::ScorerConfig;
use crate::promotion::SweepConfig;
use crate::stm::retention::RetentionTable;
use crate::storage::file::FileRecordStore;

const CONFIG_FILE: &str = "config.toml";

/// Storage locations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Data directory; defaults to `~/.engram`
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(FileRecordStore::default_dir)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionTable,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl Config {
    /// Load configuration, trying `explicit` first, then the standard
    /// locations, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for candidate in Self::standard_paths() {
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "loading configuration");
                return Self::from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngramError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&text).map_err(|e| {
            EngramError::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    fn standard_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".engram").join(CONFIG_FILE));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("engram").join(CONFIG_FILE));
        }
        paths
    }
}
