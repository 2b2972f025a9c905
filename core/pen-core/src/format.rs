//! Display formatting for durations and activity times.
//!
//! Labels follow the dashboard's Vietnamese copy. Absolute times are rendered
//! in the zone of the reference instant passed in, never the process zone.

use crate::entries::Orientation;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;

/// Label shown for a zero duration.
pub const ZERO_DURATION_LABEL: &str = "0 phút";
/// Label shown wherever a value is unavailable.
pub const PLACEHOLDER: &str = "--";
/// Label for activity observed less than a minute ago.
pub const JUST_NOW_LABEL: &str = "Vừa xong";
/// Label for a timeline entry without a timestamp.
pub const UNKNOWN_TIME_LABEL: &str = "Không rõ thời gian";

const ABSOLUTE_FORMAT: &str = "%H:%M:%S %d/%m/%Y";
const TIMELINE_FORMAT: &str = "%H:%M · %d/%m";

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Renders a duration using its coarsest non-zero units.
///
/// Hours and minutes when present; seconds only for durations under a minute.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.round().max(0.0) as u64
    } else {
        0
    };
    if total == 0 {
        return ZERO_DURATION_LABEL.to_string();
    }

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    let mut parts = Vec::with_capacity(2);
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if hours == 0 && secs > 0 && parts.is_empty() {
        parts.push(format!("{}s", secs));
    }
    parts.join(" ")
}

/// Renders how long ago `date` was, relative to `now`.
pub fn format_relative_time<Tz>(date: Option<DateTime<Utc>>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(date) = date else {
        return PLACEHOLDER.to_string();
    };

    let diff_ms = now
        .with_timezone(&Utc)
        .signed_duration_since(date)
        .num_milliseconds();

    if diff_ms < 0 {
        return format_absolute(date, &now.timezone());
    }
    if diff_ms < MINUTE_MS {
        return JUST_NOW_LABEL.to_string();
    }
    if diff_ms < HOUR_MS {
        let mins = (diff_ms as f64 / MINUTE_MS as f64).round();
        return format!("{} phút trước", mins);
    }
    if diff_ms < DAY_MS {
        let hours = (diff_ms as f64 / HOUR_MS as f64).round();
        return format!("{} giờ trước", hours);
    }
    format_absolute(date, &now.timezone())
}

/// Full local date-time, e.g. `14:05:09 30/01/2026`.
pub fn format_absolute<Tz>(date: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    date.with_timezone(tz).format(ABSOLUTE_FORMAT).to_string()
}

/// Compact label for one timeline row, e.g. `14:05 · 30/01`.
pub fn format_timeline_timestamp<Tz>(date: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match date {
        Some(date) => date.with_timezone(tz).format(TIMELINE_FORMAT).to_string(),
        None => UNKNOWN_TIME_LABEL.to_string(),
    }
}

/// Tilt readout such as `Roll=12.5°, Pitch=-3.0°`; a missing reading shows `-`.
pub fn format_orientation(orientation: Option<&Orientation>) -> String {
    let Some(orientation) = orientation else {
        return PLACEHOLDER.to_string();
    };
    let reading = |value: Option<f64>| match value {
        Some(degrees) => format!("{:.1}°", degrees),
        None => "-".to_string(),
    };
    format!(
        "Roll={}, Pitch={}",
        reading(orientation.roll),
        reading(orientation.pitch)
    )
}
