//! Configuration loading and saving.
//!
//! The config remembers which pen the user connected and how the feed should
//! behave. A missing or corrupt file yields defaults.

use crate::error::{PenError, Result};
use crate::feed::DEFAULT_TIMELINE_LIMIT;
use crate::identity::normalize_pen_id;
use crate::storage::StorageConfig;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenConfig {
    /// Pen the dashboard follows, as entered by the user.
    pub pen_id: Option<String>,
    /// Root of the file-backed store; defaults to `<storage root>/store`.
    pub store_root: Option<PathBuf>,
    /// How often a watching client re-checks the store.
    pub poll_interval_ms: u64,
    /// Keep only the newest N records per update.
    pub history_limit: Option<usize>,
    pub timeline_limit: usize,
}

impl Default for PenConfig {
    fn default() -> Self {
        Self {
            pen_id: None,
            store_root: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_limit: None,
            timeline_limit: DEFAULT_TIMELINE_LIMIT,
        }
    }
}

impl PenConfig {
    /// Validates and records the pen to follow. Returns the normalized id.
    pub fn connect(&mut self, raw_pen_id: &str) -> Result<String> {
        let pen_id = normalize_pen_id(raw_pen_id)?;
        self.pen_id = Some(pen_id.clone());
        Ok(pen_id)
    }

    /// The configured pen, or an error telling the user to connect one.
    pub fn require_pen_id(&self) -> Result<&str> {
        self.pen_id.as_deref().ok_or(PenError::PenNotConfigured)
    }

    pub fn store_root(&self, storage: &StorageConfig) -> PathBuf {
        self.store_root
            .clone()
            .unwrap_or_else(|| storage.store_dir())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Loads the config, returning defaults if the file is missing or malformed.
pub fn load_config(storage: &StorageConfig) -> PenConfig {
    match try_load_config(storage) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring unreadable config; using defaults");
            PenConfig::default()
        }
    }
}

/// Loads the config, reporting a malformed file instead of hiding it.
pub fn try_load_config(storage: &StorageConfig) -> Result<PenConfig> {
    let path = storage.config_file();
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(PenConfig::default())
        }
        Err(err) => return Err(PenError::io("Failed to read config", err)),
    };

    serde_json::from_str(&content).map_err(|err| PenError::ConfigMalformed {
        path,
        details: err.to_string(),
    })
}

/// Saves the config as pretty JSON, creating the storage root if needed.
pub fn save_config(storage: &StorageConfig, config: &PenConfig) -> Result<()> {
    let path = storage.config_file();
    let content = serde_json::to_string_pretty(config)
        .map_err(|err| PenError::json("Failed to serialize config", err))?;

    fs::create_dir_all(storage.root()).map_err(|source| PenError::ConfigWriteFailed {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, content).map_err(|source| PenError::ConfigWriteFailed { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage(temp: &TempDir) -> StorageConfig {
        StorageConfig::with_root(temp.path().join("smartpen"))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_config(&storage(&temp)), PenConfig::default());
    }

    #[test]
    fn round_trips_through_disk() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        let mut config = PenConfig::default();
        config.connect(" LTT_6001 ").unwrap();
        config.history_limit = Some(50);

        save_config(&storage, &config).unwrap();
        assert_eq!(load_config(&storage), config);
    }

    #[test]
    fn malformed_file_is_reported_but_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        std::fs::create_dir_all(storage.root()).unwrap();
        std::fs::write(storage.config_file(), "{not json").unwrap();

        assert!(matches!(
            try_load_config(&storage),
            Err(PenError::ConfigMalformed { .. })
        ));
        assert_eq!(load_config(&storage), PenConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        std::fs::create_dir_all(storage.root()).unwrap();
        std::fs::write(storage.config_file(), r#"{"pen_id":"LTT_1"}"#).unwrap();

        let config = load_config(&storage);
        assert_eq!(config.pen_id.as_deref(), Some("LTT_1"));
        assert_eq!(config.timeline_limit, DEFAULT_TIMELINE_LIMIT);
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn connect_rejects_invalid_ids() {
        let mut config = PenConfig::default();
        assert!(config.connect("").is_err());
        assert_eq!(config.pen_id, None);
        assert!(matches!(
            config.require_pen_id(),
            Err(PenError::PenNotConfigured)
        ));
    }

    #[test]
    fn store_root_defaults_under_storage() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        assert_eq!(PenConfig::default().store_root(&storage), storage.store_dir());
    }
}
