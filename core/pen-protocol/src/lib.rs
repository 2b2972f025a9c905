//! Raw activity record types shared by the pen core library and its tools.
//!
//! The device-ingestion pipeline owns this schema. Records are kept as the exact
//! JSON object received so that fields this crate does not interpret (`roll`,
//! `pitch`, ...) survive a copy between stores unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Canonical key for the duration of one activity session, in seconds.
pub const ACTIVE_TIME_KEY: &str = "ActiveTimeSeconds";
/// Canonical key for the moment the session was recorded.
pub const TIMESTAMP_KEY: &str = "Timestamp";
/// Pen tilt around its long axis at the time of the record, in degrees.
pub const ROLL_KEY: &str = "roll";
/// Pen tilt front to back at the time of the record, in degrees.
pub const PITCH_KEY: &str = "pitch";
/// Collection name under each pen/user node that holds activity records.
pub const STUDY_DATA_COLLECTION: &str = "StudyData";
/// Records larger than this are rejected by file-backed stores.
pub const MAX_RECORD_BYTES: u64 = 1024 * 1024; // 1MB

/// Path of a pen's records in the realtime store (written by the device).
pub fn realtime_path(pen_id: &str) -> String {
    format!("pens/{}/{}", pen_id, STUDY_DATA_COLLECTION)
}

/// Path of a pen's records in the document store (read by the dashboard).
pub fn document_path(pen_id: &str) -> String {
    format!("Users/{}/{}", pen_id, STUDY_DATA_COLLECTION)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Records
// ═══════════════════════════════════════════════════════════════════════════════

/// One device-reported activity session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawActivityRecord {
    fields: Map<String, Value>,
}

impl RawActivityRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Builds a record from any JSON value; only objects carry fields.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Raw duration value, if any variant of the key carries a non-null value.
    pub fn active_time_seconds(&self) -> Option<&Value> {
        self.lookup(ACTIVE_TIME_KEY)
    }

    /// Raw timestamp, classified into its tagged shape.
    pub fn timestamp(&self) -> RawTimestamp {
        self.lookup(TIMESTAMP_KEY)
            .map(RawTimestamp::from_json)
            .unwrap_or(RawTimestamp::Absent)
    }

    /// Roll reading in degrees, when the record carries a number.
    pub fn roll(&self) -> Option<f64> {
        self.lookup(ROLL_KEY).and_then(Value::as_f64)
    }

    /// Pitch reading in degrees, when the record carries a number.
    pub fn pitch(&self) -> Option<f64> {
        self.lookup(PITCH_KEY).and_then(Value::as_f64)
    }

    /// Looks up `key` as written, then lower-camel-cased, then ignoring ASCII case.
    /// Null values fall through to the next candidate.
    fn lookup(&self, key: &str) -> Option<&Value> {
        let present = |value: &&Value| !value.is_null();

        if let Some(value) = self.fields.get(key).filter(present) {
            return Some(value);
        }
        if let Some(value) = self.fields.get(&lower_camel(key)).filter(present) {
            return Some(value);
        }
        self.fields
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
            .find(present)
    }
}

fn lower_camel(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Timestamps
// ═══════════════════════════════════════════════════════════════════════════════

/// The shapes a record timestamp arrives in.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Missing, null, or falsy (`false`, `0`, `""`).
    Absent,
    /// A backend timestamp wrapper that converts to an exact instant
    /// (`{"seconds": .., "nanoseconds": ..}`).
    Instant(DateTime<Utc>),
    /// An object exposing only integer Unix seconds (`seconds` or `_seconds`).
    UnixSeconds(i64),
    /// Epoch milliseconds.
    EpochMillis(f64),
    /// Free-form text, parsed by the normalizer.
    Text(String),
}

impl RawTimestamp {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => Self::Absent,
            Value::Number(n) => match n.as_f64() {
                Some(ms) if ms != 0.0 => Self::EpochMillis(ms),
                _ => Self::Absent,
            },
            Value::String(s) if s.is_empty() => Self::Absent,
            Value::String(s) => Self::Text(s.clone()),
            Value::Object(map) => Self::from_wrapper(map),
            Value::Bool(true) | Value::Array(_) => Self::Absent,
        }
    }

    fn from_wrapper(map: &Map<String, Value>) -> Self {
        let seconds = map
            .get("seconds")
            .or_else(|| map.get("_seconds"))
            .and_then(Value::as_i64);
        let nanos = map
            .get("nanoseconds")
            .or_else(|| map.get("_nanoseconds"))
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());

        match (seconds, nanos) {
            (Some(secs), Some(nanos)) => DateTime::from_timestamp(secs, nanos)
                .map(Self::Instant)
                .unwrap_or(Self::UnixSeconds(secs)),
            (Some(secs), None) => Self::UnixSeconds(secs),
            (None, _) => Self::Absent,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Snapshots
// ═══════════════════════════════════════════════════════════════════════════════

/// The complete current set of records for one subject, keyed by record id.
///
/// Ordered by id so that every pass over a snapshot is deterministic.
pub type Snapshot = BTreeMap<String, RawActivityRecord>;

/// Converts a store payload into a snapshot.
///
/// `null` means "no data yet". Objects map ids to records; arrays (how
/// realtime stores return dense numeric keys) use the index as id. Members
/// that are not objects are skipped.
pub fn snapshot_from_json(value: Value) -> Option<Snapshot> {
    match value {
        Value::Object(members) => Some(
            members
                .into_iter()
                .filter_map(|(id, record)| RawActivityRecord::from_json(record).map(|r| (id, r)))
                .collect(),
        ),
        Value::Array(items) => Some(
            items
                .into_iter()
                .enumerate()
                .filter_map(|(index, record)| {
                    RawActivityRecord::from_json(record).map(|r| (index.to_string(), r))
                })
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawActivityRecord {
        RawActivityRecord::from_json(value).unwrap()
    }

    #[test]
    fn reads_canonical_keys() {
        let r = record(json!({"ActiveTimeSeconds": 30, "Timestamp": 1_700_000_000_000_i64}));
        assert_eq!(r.active_time_seconds(), Some(&json!(30)));
        assert_eq!(r.timestamp(), RawTimestamp::EpochMillis(1_700_000_000_000.0));
    }

    #[test]
    fn falls_back_to_camel_case_keys() {
        let r = record(json!({"activeTimeSeconds": 12, "timestamp": "2026-01-30T12:00:00Z"}));
        assert_eq!(r.active_time_seconds(), Some(&json!(12)));
        assert_eq!(r.timestamp(), RawTimestamp::Text("2026-01-30T12:00:00Z".into()));
    }

    #[test]
    fn null_canonical_key_falls_through() {
        let r = record(json!({"ActiveTimeSeconds": null, "activeTimeSeconds": 5}));
        assert_eq!(r.active_time_seconds(), Some(&json!(5)));
    }

    #[test]
    fn matches_keys_ignoring_case() {
        let r = record(json!({"ACTIVETIMESECONDS": 7}));
        assert_eq!(r.active_time_seconds(), Some(&json!(7)));
    }

    #[test]
    fn reads_orientation_numbers_only() {
        let record = RawActivityRecord::from_json(json!({"roll": 12.5, "Pitch": -3})).unwrap();
        assert_eq!(record.roll(), Some(12.5));
        assert_eq!(record.pitch(), Some(-3.0));

        let text = RawActivityRecord::from_json(json!({"roll": "12.5"})).unwrap();
        assert_eq!(text.roll(), None);
        assert_eq!(text.pitch(), None);
    }

    #[test]
    fn missing_keys_are_absent() {
        let r = record(json!({"roll": 1.5}));
        assert_eq!(r.active_time_seconds(), None);
        assert_eq!(r.timestamp(), RawTimestamp::Absent);
    }

    #[test]
    fn falsy_timestamps_are_absent() {
        for value in [json!(null), json!(false), json!(0), json!("")] {
            assert_eq!(RawTimestamp::from_json(&value), RawTimestamp::Absent);
        }
    }

    #[test]
    fn classifies_wrapper_objects() {
        assert_eq!(
            RawTimestamp::from_json(&json!({"seconds": 1_700_000_000})),
            RawTimestamp::UnixSeconds(1_700_000_000)
        );
        assert_eq!(
            RawTimestamp::from_json(&json!({"_seconds": 42})),
            RawTimestamp::UnixSeconds(42)
        );
        let exact = RawTimestamp::from_json(&json!({"seconds": 10, "nanoseconds": 500_000_000}));
        assert_eq!(
            exact,
            RawTimestamp::Instant(DateTime::from_timestamp(10, 500_000_000).unwrap())
        );
        assert_eq!(
            RawTimestamp::from_json(&json!({"seconds": "10"})),
            RawTimestamp::Absent
        );
    }

    #[test]
    fn record_serializes_as_plain_object() {
        let r = record(json!({"ActiveTimeSeconds": 1, "roll": 2.5}));
        let text = serde_json::to_string(&r).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, json!({"ActiveTimeSeconds": 1, "roll": 2.5}));
    }

    #[test]
    fn snapshot_from_object_skips_non_records() {
        let snapshot = snapshot_from_json(json!({
            "b": {"ActiveTimeSeconds": 1},
            "a": {"ActiveTimeSeconds": 2},
            "junk": 5
        }))
        .unwrap();
        let ids: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn snapshot_from_array_uses_indices() {
        let snapshot = snapshot_from_json(json!([null, {"ActiveTimeSeconds": 3}])).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("1"));
    }

    #[test]
    fn null_snapshot_is_no_data() {
        assert!(snapshot_from_json(Value::Null).is_none());
    }

    #[test]
    fn builds_store_paths() {
        assert_eq!(realtime_path("LTT_6001"), "pens/LTT_6001/StudyData");
        assert_eq!(document_path("LTT_6001"), "Users/LTT_6001/StudyData");
    }
}
