//! Resolves which pen and collection a command works on.

use clap::ValueEnum;
use pen_core::{
    document_path, load_config, normalize_pen_id, realtime_path, FileStore, PenConfig,
    StorageConfig,
};

/// Which copy of the records to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Source {
    /// `Users/{pen}/StudyData`, the copy the dashboard reads.
    #[default]
    Documents,
    /// `pens/{pen}/StudyData`, as uploaded by the pen.
    Realtime,
}

impl Source {
    pub fn path(self, pen_id: &str) -> String {
        match self {
            Source::Documents => document_path(pen_id),
            Source::Realtime => realtime_path(pen_id),
        }
    }
}

/// Everything a read command needs.
pub struct Session {
    pub config: PenConfig,
    pub pen_id: String,
    pub path: String,
    pub store: FileStore,
}

impl Session {
    /// Uses `pen` when given, otherwise the connected pen from the config.
    pub fn open(
        storage: &StorageConfig,
        pen: Option<&str>,
        source: Source,
    ) -> Result<Self, String> {
        let config = load_config(storage);
        let pen_id = match pen {
            Some(raw) => normalize_pen_id(raw)?,
            None => config.require_pen_id()?.to_string(),
        };
        let path = source.path(&pen_id);
        let store = FileStore::new(config.store_root(storage));

        Ok(Self {
            config,
            pen_id,
            path,
            store,
        })
    }
}
