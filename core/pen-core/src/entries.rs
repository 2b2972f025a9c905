//! Normalized activity entries built from a raw snapshot.

use crate::timestamp::normalize_timestamp;
use chrono::{DateTime, Utc};
use pen_protocol::{RawActivityRecord, Snapshot};
use serde::Serialize;
use serde_json::Value;

/// One activity session with a validated duration.
///
/// `seconds` is always finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedEntry {
    pub id: String,
    pub seconds: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NormalizedEntry {
    /// Sort key: epoch millis, with a missing timestamp counted as the epoch.
    fn sort_millis(&self) -> i64 {
        self.timestamp.map_or(0, |at| at.timestamp_millis())
    }
}

/// Builds entries from a snapshot, newest first.
///
/// Records whose duration is negative or not a finite number are dropped. A
/// missing duration counts as zero and a bad timestamp becomes `None`; neither
/// drops the record. Entries without a timestamp sort last.
pub fn build_entries(snapshot: &Snapshot) -> Vec<NormalizedEntry> {
    let mut entries: Vec<NormalizedEntry> = snapshot
        .iter()
        .filter_map(|(id, record)| build_entry(id, record))
        .collect();

    // Stable, and the snapshot iterates in id order, so ties resolve by id.
    entries.sort_by(|a, b| b.sort_millis().cmp(&a.sort_millis()));
    entries
}

fn build_entry(id: &str, record: &RawActivityRecord) -> Option<NormalizedEntry> {
    let seconds = record.active_time_seconds().map_or(0.0, coerce_number);
    if !seconds.is_finite() || seconds < 0.0 {
        tracing::debug!(id, seconds, "Dropping record with invalid duration");
        return None;
    }

    Some(NormalizedEntry {
        id: id.to_string(),
        seconds,
        timestamp: normalize_timestamp(&record.timestamp()),
    })
}

/// Tilt readings of one record, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Orientation {
    pub roll: Option<f64>,
    pub pitch: Option<f64>,
}

/// Orientation of the newest entry, or `None` when it carries no readings.
pub fn latest_orientation(
    snapshot: &Snapshot,
    entries: &[NormalizedEntry],
) -> Option<Orientation> {
    let record = snapshot.get(&entries.first()?.id)?;
    let orientation = Orientation {
        roll: record.roll(),
        pitch: record.pitch(),
    };
    (orientation.roll.is_some() || orientation.pitch.is_some()).then_some(orientation)
}

/// Numeric coercion with the same outcomes as the dashboard's `Number(..)`.
fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}
