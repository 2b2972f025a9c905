//! Tracing setup for the `smartpen` binary.
//!
//! Logs go to a daily rolling file under the storage root so that stdout stays
//! reserved for command output. If the log directory is unusable, logs fall
//! back to stderr.

use pen_core::StorageConfig;
use std::env;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const DEBUG_ENV: &str = "SMARTPEN_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "smartpen";
const LOG_FILE_SUFFIX: &str = "log";

/// Installs the global subscriber. Keep the returned guard alive until exit or
/// buffered lines are lost.
pub fn init(storage: Option<&StorageConfig>) -> Option<WorkerGuard> {
    let filter = env_filter();

    let appender = storage.and_then(|storage| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix(LOG_FILE_SUFFIX)
            .build(storage.logs_dir())
            .ok()
    });

    match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
            None
        }
    }
}

fn env_filter() -> EnvFilter {
    if debug_enabled(env::var(DEBUG_ENV).ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}
