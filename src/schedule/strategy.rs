//! The schedule modes and the order in which they claim a tick.

use std::fmt;

use super::{LocalMoment, TimeWindow};
use crate::config::ScheduleConfig;
use crate::geo::{SunsetError, SunsetProvider};

/// A scheduling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleMode {
    /// The window configured for today's weekday.
    PerDay,
    /// Named entries for today's weekday.
    Custom,
    /// From local sunset plus an offset until the configured end of night.
    Sunset,
    /// The default window on the active days.
    Default,
}

/// Modes in the order they are offered the tick. The first one to claim it decides.
pub const PRIORITY: [ScheduleMode; 4] = [
    ScheduleMode::PerDay,
    ScheduleMode::Custom,
    ScheduleMode::Sunset,
    ScheduleMode::Default,
];

/// Result of a mode claiming a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub active: bool,
    /// The window that was checked, if a single one applies.
    pub window: Option<TimeWindow>,
    /// Set when sunset mode fell back to the default window.
    pub sunset_error: Option<SunsetError>,
}

impl Claim {
    fn window(window: TimeWindow, now: LocalMoment) -> Self {
        Self {
            active: window.contains(now.time),
            window: Some(window),
            sunset_error: None,
        }
    }
}

impl ScheduleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleMode::PerDay => "per-day",
            ScheduleMode::Custom => "custom",
            ScheduleMode::Sunset => "sunset",
            ScheduleMode::Default => "default",
        }
    }

    /// Decide the tick if this mode applies, or pass it on with `None`.
    pub fn claim(
        self,
        config: &ScheduleConfig,
        now: LocalMoment,
        sunset: &dyn SunsetProvider,
    ) -> Option<Claim> {
        match self {
            ScheduleMode::PerDay => {
                if !config.per_day_enabled {
                    return None;
                }
                let window = config.per_day.get(&now.day)?;
                Some(Claim::window(*window, now))
            }
            ScheduleMode::Custom => {
                if !config.custom_enabled {
                    return None;
                }
                // Claims even without entries for today; that just means "off".
                let matching = config
                    .custom
                    .iter()
                    .filter(|entry| entry.enabled && entry.day == now.day)
                    .map(|entry| entry.window())
                    .find(|window| window.contains(now.time));
                Some(Claim {
                    active: matching.is_some(),
                    window: matching,
                    sunset_error: None,
                })
            }
            ScheduleMode::Sunset => {
                if !config.sunset.enabled || !config.sunset.has_coordinates() {
                    return None;
                }
                match sunset.lookup(config.sunset.latitude, config.sunset.longitude) {
                    Ok(sunset_time) => {
                        let window = TimeWindow::with_start_offset(
                            sunset_time,
                            config.sunset.offset_minutes,
                            config.sunset_window_end(),
                        );
                        Some(Claim::window(window, now))
                    }
                    Err(error) => {
                        let mut claim = default_claim(config, now);
                        claim.sunset_error = Some(error);
                        Some(claim)
                    }
                }
            }
            ScheduleMode::Default => Some(default_claim(config, now)),
        }
    }
}

fn default_claim(config: &ScheduleConfig, now: LocalMoment) -> Claim {
    let window = config.default_window();
    Claim {
        active: config.active_days.contains(&now.day) && window.contains(now.time),
        window: Some(window),
        sunset_error: None,
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
