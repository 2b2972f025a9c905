//! Error types for pen-core operations.

use std::path::PathBuf;

/// All errors that can occur in pen-core operations.
///
/// Malformed records never surface here: they are recovered or dropped while
/// building entries. Errors are reserved for configuration, identity, and the
/// stores the feed reads from.
#[derive(Debug, thiserror::Error)]
pub enum PenError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No pen configured; run `smartpen connect <PEN_ID>` first")]
    PenNotConfigured,

    // ─────────────────────────────────────────────────────────────────────
    // Pen Identity Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid pen id {id:?}: {reason}")]
    InvalidPenId { id: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────
    // Store / Transport Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Store unavailable: {0}")]
    Transport(String),

    #[error("Record too large: {path} ({size} bytes)")]
    RecordTooLarge { path: PathBuf, size: u64 },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PenError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PenError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        PenError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using PenError.
pub type Result<T> = std::result::Result<T, PenError>;

impl From<PenError> for String {
    fn from(err: PenError) -> String {
        err.to_string()
    }
}
