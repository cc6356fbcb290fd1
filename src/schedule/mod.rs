//! Schedule evaluation: one boolean per tick from possibly conflicting modes.
//!
//! Every mode's settings may be present at once. The modes in [`PRIORITY`] are offered the
//! tick in order (per-day, custom, sunset, default) and the first that claims it decides.
//! All comparisons use local wall-clock time of day with the half-open containment rule
//! of [`TimeWindow::contains`].

pub mod strategy;
pub mod window;

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike, Weekday};

use crate::common::utils::format_time;
use crate::config::ScheduleConfig;
use crate::geo::{SunsetError, SunsetProvider};

pub use strategy::{Claim, PRIORITY, ScheduleMode};
pub use window::TimeWindow;

/// A local weekday and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalMoment {
    pub day: Weekday,
    pub time: NaiveTime,
}

impl LocalMoment {
    pub fn new(day: Weekday, time: NaiveTime) -> Self {
        Self { day, time }
    }

    /// Take the weekday and time of day as shown in `dt`'s own zone.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        let time = dt.time();
        // Leap-second representation is not a separate wall-clock time.
        let time = time.with_nanosecond(time.nanosecond() % 1_000_000_000).unwrap_or(time);
        Self {
            day: dt.weekday(),
            time,
        }
    }

    /// The current moment from the global time source.
    pub fn now() -> Self {
        Self::from_datetime(&crate::time_source::now())
    }
}

/// What decided a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionBasis {
    /// Scheduling is switched off.
    Disabled,
    /// The active-day set is empty, so nothing can be scheduled.
    NoActiveDays,
    /// A schedule mode claimed the tick.
    Mode(ScheduleMode),
}

/// A decision together with how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub active: bool,
    pub basis: DecisionBasis,
    pub window: Option<TimeWindow>,
    pub sunset_error: Option<SunsetError>,
}

impl Decision {
    fn off(basis: DecisionBasis) -> Self {
        Self {
            active: false,
            basis,
            window: None,
            sunset_error: None,
        }
    }

    /// The mode that claimed the tick, if any.
    pub fn mode(&self) -> Option<ScheduleMode> {
        match self.basis {
            DecisionBasis::Mode(mode) => Some(mode),
            _ => None,
        }
    }

    /// Short human-readable reason for logs and `status`.
    pub fn describe(&self) -> String {
        let state = if self.active { "on" } else { "off" };
        match self.basis {
            DecisionBasis::Disabled => "scheduling disabled".to_string(),
            DecisionBasis::NoActiveDays => "no active days configured".to_string(),
            DecisionBasis::Mode(mode) => {
                let mut text = format!("{state} ({mode} mode");
                if let Some(window) = self.window {
                    text.push_str(&format!(", window {window}"));
                }
                if let Some(error) = &self.sunset_error {
                    text.push_str(&format!(", sunset unavailable: {error}"));
                }
                text.push(')');
                text
            }
        }
    }
}

/// Whether night mode should be on at `now`.
pub fn evaluate(config: &ScheduleConfig, now: LocalMoment, sunset: &dyn SunsetProvider) -> bool {
    evaluate_detailed(config, now, sunset).active
}

/// Like [`evaluate`], also reporting which mode decided and why.
pub fn evaluate_detailed(
    config: &ScheduleConfig,
    now: LocalMoment,
    sunset: &dyn SunsetProvider,
) -> Decision {
    if !config.enabled {
        return Decision::off(DecisionBasis::Disabled);
    }
    if config.active_days.is_empty() {
        return Decision::off(DecisionBasis::NoActiveDays);
    }

    for mode in PRIORITY {
        if let Some(claim) = mode.claim(config, now, sunset) {
            return Decision {
                active: claim.active,
                basis: DecisionBasis::Mode(mode),
                window: claim.window,
                sunset_error: claim.sunset_error,
            };
        }
    }

    // Default always claims.
    Decision::off(DecisionBasis::Mode(ScheduleMode::Default))
}

/// Describe the next change of the default window relative to `now`.
pub fn next_event(config: &ScheduleConfig, now: LocalMoment) -> String {
    if !config.enabled {
        return "Scheduling disabled".to_string();
    }
    if config.custom_enabled {
        return "Custom schedule active".to_string();
    }

    let window = config.default_window();
    if window.contains(now.time) {
        format!("Night mode ends at {}", format_time(window.end))
    } else if !window.crosses_midnight() && now.time >= window.end {
        format!("Night mode starts tomorrow at {}", format_time(window.start))
    } else {
        format!("Night mode starts at {}", format_time(window.start))
    }
}
