//! Activity aggregation.
//!
//! Folds normalized entries into today/week/month/all-time totals relative to
//! a reference instant. The fold is a pure function of its inputs and is rerun
//! from scratch for every snapshot; no running counters are kept between
//! updates.

use crate::entries::NormalizedEntry;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::Serialize;

/// Totals derived from one snapshot of entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub today_seconds: f64,
    pub week_seconds: f64,
    pub month_seconds: f64,
    pub total_seconds: f64,
    pub longest_session_today: f64,
    /// Timestamp of the newest entry. Only the first entry is consulted: if it
    /// has no timestamp this stays `None` even when older entries have one.
    pub latest_timestamp: Option<DateTime<Utc>>,
    /// Seconds per day of the current month; index 0 is the 1st.
    pub monthly_histogram: Vec<f64>,
}

/// Calendar boundaries around a reference instant, resolved in its zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindow {
    pub today_start: DateTime<Utc>,
    /// Monday of the ISO week containing the reference instant.
    pub week_start: DateTime<Utc>,
    pub month_start: DateTime<Utc>,
    pub next_month_start: DateTime<Utc>,
    pub days_in_month: u32,
}

impl CalendarWindow {
    pub fn around<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let today = now.date_naive();
        let days_since_monday = u64::from(today.weekday().number_from_monday() - 1);
        let week = today
            .checked_sub_days(Days::new(days_since_monday))
            .unwrap_or(today);
        let first = today.with_day(1).unwrap_or(today);
        let next_first = first_of_next_month(first);
        let days_in_month = next_first
            .signed_duration_since(first)
            .num_days()
            .clamp(1, 31) as u32;

        Self {
            today_start: local_midnight(now, today),
            week_start: local_midnight(now, week),
            month_start: local_midnight(now, first),
            next_month_start: local_midnight(now, next_first),
            days_in_month,
        }
    }

    fn in_month(&self, at: DateTime<Utc>) -> bool {
        at >= self.month_start && at < self.next_month_start
    }
}

fn first_of_next_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first)
}

/// Midnight of `date` in the zone of `now`.
///
/// When midnight does not exist locally (a DST gap), the offset of `now` is used.
fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match now.timezone().from_local_datetime(&naive).earliest() {
        Some(at) => at.with_timezone(&Utc),
        None => {
            let fixed = now.offset().fix();
            Utc.from_utc_datetime(&(naive - fixed))
        }
    }
}

/// Aggregates entries relative to `now`.
///
/// Returns `None` when there are no entries, which callers render as "no
/// data" rather than as zero totals. Entries are expected newest first, as
/// produced by [`crate::entries::build_entries`].
pub fn aggregate<Tz: TimeZone>(
    entries: &[NormalizedEntry],
    now: &DateTime<Tz>,
) -> Option<AggregateSnapshot> {
    if entries.is_empty() {
        return None;
    }

    let window = CalendarWindow::around(now);
    let zone = now.timezone();
    let mut snapshot = AggregateSnapshot {
        today_seconds: 0.0,
        week_seconds: 0.0,
        month_seconds: 0.0,
        total_seconds: 0.0,
        longest_session_today: 0.0,
        latest_timestamp: entries.first().and_then(|entry| entry.timestamp),
        monthly_histogram: vec![0.0; window.days_in_month as usize],
    };

    for entry in entries {
        snapshot.total_seconds += entry.seconds;

        let Some(at) = entry.timestamp else {
            continue;
        };

        if at >= window.today_start {
            snapshot.today_seconds += entry.seconds;
            snapshot.longest_session_today = snapshot.longest_session_today.max(entry.seconds);
        }
        if at >= window.week_start {
            snapshot.week_seconds += entry.seconds;
        }
        if window.in_month(at) {
            snapshot.month_seconds += entry.seconds;
            let day = at.with_timezone(&zone).day() as usize;
            let index = day.saturating_sub(1).min(snapshot.monthly_histogram.len() - 1);
            snapshot.monthly_histogram[index] += entry.seconds;
        }
    }

    Some(snapshot)
}
