//! Window policy for periodic aggregations
//!
//! Every aggregation is computed over half-open `[from, to)` windows whose
//! start is aligned to the calendar day or week (UTC) containing the
//! requested instant. Window bounds are kept in seconds; the indexer stores
//! block timestamps in nanoseconds, so queries bind [`TimeRange`] values.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DAY_SECONDS: i64 = 86_400;
pub const WEEK_SECONDS: i64 = 7 * DAY_SECONDS;

/// NEAR mainnet genesis (2020-07-21 16:55:51 UTC). Backfills never start earlier.
pub const GENESIS_EPOCH_SECONDS: i64 = 1_595_350_551;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Latest instant whose window still has nanosecond bounds that fit an `i64`
pub const MAX_TIMESTAMP_SECONDS: i64 = i64::MAX / NANOS_PER_SECOND - WEEK_SECONDS;

// 1970-01-01 was a Thursday, three days after Monday.
const EPOCH_DAYS_AFTER_MONDAY: i64 = 3;

/// How often an aggregation is collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Daily,
    Weekly,
}

impl Periodicity {
    /// Window length in seconds
    pub fn seconds(self) -> i64 {
        match self {
            Periodicity::Daily => DAY_SECONDS,
            Periodicity::Weekly => WEEK_SECONDS,
        }
    }

    /// Start of the day (or Monday-based week) containing `timestamp`
    pub fn start_of_window(self, timestamp: i64) -> i64 {
        match self {
            Periodicity::Daily => timestamp - timestamp.rem_euclid(DAY_SECONDS),
            Periodicity::Weekly => {
                let days = timestamp.div_euclid(DAY_SECONDS);
                let monday = days - (days + EPOCH_DAYS_AFTER_MONDAY).rem_euclid(7);
                monday * DAY_SECONDS
            }
        }
    }

    /// The window containing `timestamp`
    ///
    /// Bounds saturate near `i64::MAX`; callers taking timestamps from
    /// outside check them with [`is_supported_timestamp`] first.
    pub fn window_containing(self, timestamp: i64) -> ExecutionWindow {
        let from = self.start_of_window(timestamp);
        ExecutionWindow {
            from,
            to: from.saturating_add(self.seconds()),
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Periodicity::Daily => write!(f, "daily"),
            Periodicity::Weekly => write!(f, "weekly"),
        }
    }
}

/// Whether `timestamp` (unix seconds) can be turned into a query window
pub fn is_supported_timestamp(timestamp: i64) -> bool {
    (0..=MAX_TIMESTAMP_SECONDS).contains(&timestamp)
}

/// Half-open `[from, to)` interval in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionWindow {
    from: i64,
    to: i64,
}

impl ExecutionWindow {
    pub fn from_timestamp(&self) -> i64 {
        self.from
    }

    pub fn to_timestamp(&self) -> i64 {
        self.to
    }

    pub fn duration_seconds(&self) -> i64 {
        self.to - self.from
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.from <= timestamp && timestamp < self.to
    }

    /// The adjacent window of the same length
    pub fn following(&self) -> ExecutionWindow {
        ExecutionWindow {
            from: self.to,
            to: self.to.saturating_add(self.duration_seconds()),
        }
    }

    /// UTC date the window starts on
    pub fn start_date(&self) -> Option<NaiveDate> {
        DateTime::<Utc>::from_timestamp(self.from, 0).map(|dt| dt.date_naive())
    }

    /// Nanosecond bounds for binding into indexer queries
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            from_nanos: self.from.saturating_mul(NANOS_PER_SECOND),
            to_nanos: self.to.saturating_mul(NANOS_PER_SECOND),
        }
    }
}

impl fmt::Display for ExecutionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start_date() {
            Some(date) if self.duration_seconds() == DAY_SECONDS => write!(f, "{}", date),
            Some(date) => write!(f, "{} (+{}d)", date, self.duration_seconds() / DAY_SECONDS),
            None => write!(f, "[{}, {})", self.from, self.to),
        }
    }
}

/// Query bounds in nanoseconds, bound as `$1` / `$2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub from_nanos: i64,
    pub to_nanos: i64,
}

impl TimeRange {
    /// Covers all history; used by one-pass full recomputes
    pub fn unbounded() -> Self {
        Self {
            from_nanos: 0,
            to_nanos: i64::MAX,
        }
    }

    pub fn contains_nanos(&self, timestamp_nanos: i64) -> bool {
        self.from_nanos <= timestamp_nanos && timestamp_nanos < self.to_nanos
    }
}

/// Source of "now" in unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}
