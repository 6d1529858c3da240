/// Calendar-day normalization
///
/// Every streak and aggregation computation compares days, never instants.
/// A `DayNormalizer` pins one UTC offset for a whole computation so that two
/// timestamps on either side of local midnight always land on the same keys
/// no matter when during the computation they are normalized.

use std::fmt;

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Clock, DomainError};

/// A calendar date with no time-of-day component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub const MIN: DayKey = DayKey(NaiveDate::MIN);
    pub const MAX: DayKey = DayKey(NaiveDate::MAX);

    /// Build a day key from its calendar parts
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DomainError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| {
                DomainError::InvalidDate(format!("{:04}-{:02}-{:02} is not a calendar date", year, month, day))
            })
    }

    /// Parse a `YYYY-MM-DD` string
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| DomainError::InvalidDate(format!("'{}' is not a YYYY-MM-DD date: {}", s, e)))
    }

    /// Shift by a signed number of days, or `None` past the calendar range
    pub fn checked_offset(self, days: i64) -> Option<Self> {
        let shifted = if days >= 0 {
            self.0.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.0.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        shifted.map(Self)
    }

    /// Shift by a signed number of days, saturating at the first and last
    /// representable day
    pub fn offset(self, days: i64) -> Self {
        self.checked_offset(days).unwrap_or(if days < 0 { Self::MIN } else { Self::MAX })
    }

    /// The day before
    pub fn pred(self) -> Self {
        self.offset(-1)
    }

    /// The day after
    pub fn succ(self) -> Self {
        self.offset(1)
    }

    /// Weekday number with Sunday as 0, matching habit target days
    pub fn weekday_index(&self) -> u8 {
        self.0.weekday().num_days_from_sunday() as u8
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// `a - b` in whole days; negative when `a` is earlier than `b`
pub fn days_between(a: DayKey, b: DayKey) -> i64 {
    (a.0 - b.0).num_days()
}

/// Parse an RFC 3339 timestamp into a UTC instant
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::InvalidTimestamp(format!("'{}': {}", s, e)))
}

/// Converts instants to day keys under one fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayNormalizer {
    offset: FixedOffset,
}

impl DayNormalizer {
    /// Normalize at UTC midnight
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Capture the machine's local offset as it is at `now`
    ///
    /// The offset is frozen here; a DST transition later in the same
    /// computation does not move the midnight boundary.
    pub fn local_at(now: DateTime<Utc>) -> Self {
        Self {
            offset: Local.offset_from_utc_datetime(&now.naive_utc()),
        }
    }

    /// Strip the time of day from `timestamp` in this normalizer's frame
    pub fn day_key(&self, timestamp: DateTime<Utc>) -> DayKey {
        DayKey(timestamp.with_timezone(&self.offset).date_naive())
    }

    /// The current day according to `clock`
    pub fn today(&self, clock: &dyn Clock) -> DayKey {
        self.day_key(clock.now())
    }

    /// The instant at which `day` begins in this frame
    pub fn start_of_day(&self, day: DayKey) -> DateTime<Utc> {
        let local_midnight = day.0.and_time(NaiveTime::MIN);
        let utc = local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }
}

impl Default for DayNormalizer {
    fn default() -> Self {
        Self::utc()
    }
}
