//! Temporal helpers: window overlap durations, signed time differences, and
//! wall-clock calendar predicates.
//!
//! Calendar predicates read the hour and weekday in the timestamp's own
//! offset; weekend and after-hours are independent, non-exclusive flags.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use sentinel_core::TimeWindow;

/// Units for duration conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Days => 86_400.0,
        }
    }
}

/// Duration of the possible overlap `[max(earliest_starts), min(latest_ends)]`
/// between two windows, clamped to ≥ 0 and converted to `unit`. Zero when the
/// windows do not overlap.
pub fn overlap_duration(w1: &TimeWindow, w2: &TimeWindow, unit: TimeUnit) -> f64 {
    let start = w1.earliest_start.max(w2.earliest_start);
    let end = w1.latest_end.min(w2.latest_end);
    let secs = (end - start).num_seconds().max(0) as f64;
    secs / unit.seconds()
}

/// Signed duration from `t1` to `t2` (positive when `t2` is later),
/// converted to `unit`.
pub fn time_difference(
    t1: DateTime<FixedOffset>,
    t2: DateTime<FixedOffset>,
    unit: TimeUnit,
) -> f64 {
    (t2 - t1).num_seconds() as f64 / unit.seconds()
}

/// The wall-clock hour of `dt` as a fraction (10:45 → 10.75).
fn fractional_hour(dt: DateTime<FixedOffset>) -> f64 {
    dt.hour() as f64 + dt.minute() as f64 / 60.0 + dt.second() as f64 / 3_600.0
}

/// Whether `dt` falls inside `[start_hour, end_hour)` in fractional
/// wall-clock hours (e.g. 19.5 = 19:30).
pub fn is_within_time_range(dt: DateTime<FixedOffset>, start_hour: f64, end_hour: f64) -> bool {
    let h = fractional_hour(dt);
    h >= start_hour && h < end_hour
}

/// Default business-hours bounds.
pub const BUSINESS_HOURS_START: f64 = 9.0;
pub const BUSINESS_HOURS_END: f64 = 18.0;

pub fn is_business_hours(dt: DateTime<FixedOffset>) -> bool {
    is_within_time_range(dt, BUSINESS_HOURS_START, BUSINESS_HOURS_END)
}

pub fn is_after_hours(dt: DateTime<FixedOffset>) -> bool {
    fractional_hour(dt) >= BUSINESS_HOURS_END
}

pub fn is_weekend(dt: DateTime<FixedOffset>) -> bool {
    matches!(dt.weekday(), Weekday::Sat | Weekday::Sun)
}
