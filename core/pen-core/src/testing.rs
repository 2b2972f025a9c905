//! Shared fixtures for unit tests.

use chrono::{
    FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
};

/// Central European time for 2026 with a single switch to summer time on
/// 2026-03-29 at 01:00 UTC (02:00 local jumps to 03:00).
#[derive(Debug, Clone, Copy)]
pub struct Berlin2026;

impl Berlin2026 {
    pub fn winter() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    pub fn summer() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn switch_utc() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 29)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap()
    }
}

impl TimeZone for Berlin2026 {
    type Offset = FixedOffset;

    fn from_offset(_offset: &FixedOffset) -> Self {
        Berlin2026
    }

    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
        self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
        let switch = Self::switch_utc();
        if *local - Self::winter() < switch {
            LocalResult::Single(Self::winter())
        } else if *local - Self::summer() >= switch {
            LocalResult::Single(Self::summer())
        } else {
            LocalResult::None
        }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
        self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
        if *utc < Self::switch_utc() {
            Self::winter()
        } else {
            Self::summer()
        }
    }
}
