//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};

/// Korea Standard Time offset in hours, the zone the consultation desk works in.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Build a fixed offset from whole hours, falling back to UTC when out of range.
pub fn offset_from_hours(hours: i32) -> FixedOffset {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| {
            tracing::warn!("UTC offset {}h is out of range, using UTC", hours);
            Utc.fix()
        })
}

/// Format a Unix timestamp (milliseconds) as a two-digit `HH:MM` time of day.
///
/// Returns an empty string for timestamps chrono cannot represent.
pub fn timestamp_to_time_of_day(timestamp_millis: i64, offset: FixedOffset) -> String {
    match DateTime::from_timestamp_millis(timestamp_millis) {
        Some(dt) => dt.with_timezone(&offset).format("%H:%M").to_string(),
        None => String::new(),
    }
}

/// Parse an ISO-8601 date-time into Unix milliseconds.
///
/// Accepts RFC 3339 strings with an explicit offset as well as local
/// date-times without one (`2024-05-01T10:15:30.123`), which are
/// interpreted in the given offset.
pub fn parse_datetime_millis(text: &str, offset: FixedOffset) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }

    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    naive
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.timestamp_millis())
}
