//! Storage configuration and path management for the smart pen tools.
//!
//! All file locations are decided here. Production code uses
//! [`StorageConfig::resolve`] (`~/.smartpen`, or `$SMARTPEN_HOME`); tests use
//! [`StorageConfig::with_root`] with a temp directory.

use crate::error::{PenError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable that relocates the storage root.
pub const HOME_ENV: &str = "SMARTPEN_HOME";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the root from `$SMARTPEN_HOME`, falling back to `~/.smartpen`.
    pub fn resolve() -> Result<Self> {
        if let Some(root) = env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }
        let home = dirs::home_dir().ok_or(PenError::HomeDirNotFound)?;
        Ok(Self::with_root(home.join(".smartpen")))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.json (pen id and feed preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Directory for rolling log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Default root of the file-backed record store.
    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }
}
