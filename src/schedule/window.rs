//! Time-of-day windows and the containment rule every schedule mode shares.

use chrono::{Duration, NaiveTime};
use serde::Deserialize;

/// A `[start, end)` window of wall-clock time.
///
/// `start > end` wraps past midnight (22:00–08:00 covers the night), `start == end` is
/// zero-width and never active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimeWindow {
    #[serde(deserialize_with = "crate::config::time_format::deserialize")]
    pub start: NaiveTime,
    #[serde(deserialize_with = "crate::config::time_format::deserialize")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether the window wraps past midnight.
    pub fn crosses_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Whether the window has zero width.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Containment rule: start inclusive, end exclusive.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }

    /// Window whose start is moved by `minutes` (negative moves it earlier), wrapping
    /// around midnight.
    pub fn with_start_offset(start: NaiveTime, minutes: i32, end: NaiveTime) -> Self {
        // NaiveTime + Duration wraps at 24h
        let start = start + Duration::minutes(i64::from(minutes));
        Self { start, end }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}–{}",
            crate::common::utils::format_time(self.start),
            crate::common::utils::format_time(self.end)
        )
    }
}
