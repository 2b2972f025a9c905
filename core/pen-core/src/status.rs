//! Connection/activity status derived from the newest activity timestamp.
//!
//! ```text
//! Disconnected --(record seen, age <= 2 min)--> Writing
//! Writing      --(age > 2 min)----------------> Idle
//! Idle         --(new record, age <= 2 min)---> Writing
//! any          --(source reports no data)-----> Disconnected
//! ```
//!
//! The diagram describes how successive classifications relate; no transition
//! state is stored. Every update classifies from scratch.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

/// Activity at most this old counts as live writing.
pub const WRITING_WINDOW_SECS: i64 = 2 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Idle,
    Writing,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Writing => "writing",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies the pen from the newest activity timestamp.
///
/// Timestamps ahead of `now` count as writing.
pub fn classify_status<Tz: TimeZone>(
    latest: Option<DateTime<Utc>>,
    now: &DateTime<Tz>,
) -> ConnectionStatus {
    let Some(latest) = latest else {
        return ConnectionStatus::Disconnected;
    };

    let age = now.with_timezone(&Utc).signed_duration_since(latest);
    if age <= Duration::seconds(WRITING_WINDOW_SECS) {
        ConnectionStatus::Writing
    } else {
        ConnectionStatus::Idle
    }
}
