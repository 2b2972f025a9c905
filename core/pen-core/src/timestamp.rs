//! Timestamp normalization.
//!
//! Collapses every [`RawTimestamp`] shape into a single absolute instant.
//! Unparseable input yields `None`; nothing here returns an error.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use pen_protocol::RawTimestamp;

/// Largest magnitude, in milliseconds, a date may sit from the epoch.
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

/// Naive layouts interpreted in the local zone.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Converts a raw record timestamp into an instant.
pub fn normalize_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Absent => None,
        RawTimestamp::Instant(at) => Some(*at),
        RawTimestamp::UnixSeconds(secs) => secs
            .checked_mul(1000)
            .and_then(DateTime::from_timestamp_millis),
        RawTimestamp::EpochMillis(ms) => from_epoch_millis(*ms),
        RawTimestamp::Text(text) => parse_text(text),
    }
}

fn from_epoch_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() || ms == 0.0 || ms.abs() > MAX_EPOCH_MILLIS {
        return None;
    }
    DateTime::from_timestamp_millis(ms.trunc() as i64)
}

/// Best-effort date parsing for free-form text.
///
/// Accepts RFC 3339, RFC 2822, naive date-times (local zone), bare dates
/// (UTC midnight) and numeric epoch milliseconds.
pub fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if is_numeric(text) {
        return text.parse::<f64>().ok().and_then(from_epoch_millis);
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = DateTime::parse_from_rfc2822(text) {
        return Some(at.with_timezone(&Utc));
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|at| at.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn is_numeric(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn absent_is_none() {
        assert_eq!(normalize_timestamp(&RawTimestamp::Absent), None);
    }

    #[test]
    fn instant_is_used_directly() {
        let at = utc(2026, 1, 30, 12, 0, 0);
        assert_eq!(normalize_timestamp(&RawTimestamp::Instant(at)), Some(at));
    }

    #[test]
    fn unix_seconds_are_scaled_to_millis() {
        let raw = RawTimestamp::UnixSeconds(1_700_000_000);
        assert_eq!(
            normalize_timestamp(&raw),
            DateTime::from_timestamp_millis(1_700_000_000_000)
        );
    }

    #[test]
    fn epoch_millis_truncate_fractions() {
        let raw = RawTimestamp::EpochMillis(1_700_000_000_123.9);
        assert_eq!(
            normalize_timestamp(&raw),
            DateTime::from_timestamp_millis(1_700_000_000_123)
        );
    }

    #[test]
    fn out_of_range_millis_are_none() {
        assert_eq!(normalize_timestamp(&RawTimestamp::EpochMillis(f64::NAN)), None);
        assert_eq!(normalize_timestamp(&RawTimestamp::EpochMillis(9e15)), None);
        assert_eq!(normalize_timestamp(&RawTimestamp::UnixSeconds(i64::MAX)), None);
    }

    #[test]
    fn parses_rfc3339_text() {
        let raw = RawTimestamp::Text("2026-01-30T19:00:00+07:00".into());
        assert_eq!(normalize_timestamp(&raw), Some(utc(2026, 1, 30, 12, 0, 0)));
    }

    #[test]
    fn parses_rfc2822_text() {
        assert_eq!(
            parse_text("Fri, 30 Jan 2026 12:00:00 +0000"),
            Some(utc(2026, 1, 30, 12, 0, 0))
        );
    }

    #[test]
    fn bare_dates_are_utc_midnight() {
        assert_eq!(parse_text("2026-01-30"), Some(utc(2026, 1, 30, 0, 0, 0)));
    }

    #[test]
    fn naive_date_times_parse_in_local_zone() {
        let parsed = parse_text("2026-01-30 08:15:00").unwrap();
        assert_eq!(
            parsed.with_timezone(&Local).naive_local(),
            NaiveDate::from_ymd_opt(2026, 1, 30)
                .unwrap()
                .and_hms_opt(8, 15, 0)
                .unwrap()
        );
    }

    #[test]
    fn numeric_text_is_epoch_millis() {
        assert_eq!(
            parse_text(" 1700000000000 "),
            DateTime::from_timestamp_millis(1_700_000_000_000)
        );
    }

    #[test]
    fn garbage_text_is_none() {
        assert_eq!(parse_text("not a date"), None);
        assert_eq!(parse_text("   "), None);
        assert_eq!(parse_text("0"), None);
    }
}
