//! Configuration for autonight: schedule, controller and general settings.
//!
//! The configuration lives in `~/.config/autonight/autonight.toml` (or in the directory
//! given with `--config`). A commented default file is written on first start.
//!
//! ```toml
//! [schedule]
//! enabled = true
//! start = "22:00"                      # Default window start (HH:MM or HH:MM:SS)
//! end = "08:00"                        # Default window end, may be earlier than start
//! active_days = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
//! per_day_enabled = false
//! custom_enabled = false
//!
//! [schedule.per_day.fri]
//! start = "23:00"
//! end = "09:00"
//!
//! [[schedule.custom]]
//! name = "Movie night"
//! day = "sat"
//! start = "20:00"
//! end = "23:30"
//!
//! [schedule.sunset]
//! enabled = false
//! latitude = 52.52
//! longitude = 13.405
//! offset_minutes = 30
//! window_end = "07:00"                 # Defaults to schedule.end
//!
//! [controller]
//! method = "keyboard"                  # "keyboard" or "serial"
//! toggle_key = "F12"
//! toggle_delay_ms = 500
//! serial_port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! serial_timeout_ms = 1000
//! initial_state = "unknown"            # Assumed state at startup: "unknown", "on" or "off"
//!
//! [general]
//! check_interval = 30                  # Seconds between schedule evaluations
//! sunset_timeout_ms = 5000
//! debug = false
//! ```
//!
//! Settings for every schedule mode can coexist; which one decides a tick is resolved by
//! the evaluator in `schedule`.

pub mod builder;
pub mod loading;
pub mod validation;
pub mod watcher;

use chrono::{NaiveTime, Weekday};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::backend::DeviceStatus;
use crate::common::constants::*;
use crate::common::utils::{format_duration_secs, format_time, parse_time_of_day};
use crate::schedule::TimeWindow;

pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};
pub use watcher::start_config_watcher;

/// All seven days, Monday first.
pub const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Top-level configuration snapshot.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub controller: ControllerConfig,
    pub general: GeneralConfig,
}

/// Scheduling settings. Every mode's settings may be present at once.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    pub enabled: bool,
    #[serde(deserialize_with = "time_format::deserialize")]
    pub start: NaiveTime,
    #[serde(deserialize_with = "time_format::deserialize")]
    pub end: NaiveTime,
    pub active_days: HashSet<Weekday>,
    pub per_day_enabled: bool,
    /// Sparse: days without an entry are left to the next mode.
    pub per_day: HashMap<Weekday, TimeWindow>,
    pub custom_enabled: bool,
    pub custom: Vec<CustomEntry>,
    pub sunset: SunsetConfig,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start: parse_time_of_day(DEFAULT_START_TIME).unwrap_or_default(),
            end: parse_time_of_day(DEFAULT_END_TIME).unwrap_or_default(),
            active_days: ALL_DAYS.into_iter().collect(),
            per_day_enabled: false,
            per_day: HashMap::new(),
            custom_enabled: false,
            custom: Vec::new(),
            sunset: SunsetConfig::default(),
        }
    }
}

impl ScheduleConfig {
    /// The default daily window.
    pub fn default_window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    /// End of the night for sunset mode.
    pub fn sunset_window_end(&self) -> NaiveTime {
        self.sunset.window_end.unwrap_or(self.end)
    }
}

/// A named schedule entry for one weekday.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomEntry {
    #[serde(default)]
    pub name: String,
    pub day: Weekday,
    #[serde(deserialize_with = "time_format::deserialize")]
    pub start: NaiveTime,
    #[serde(deserialize_with = "time_format::deserialize")]
    pub end: NaiveTime,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl CustomEntry {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Sunset-relative window settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SunsetConfig {
    pub enabled: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub offset_minutes: i32,
    #[serde(deserialize_with = "time_format::deserialize_opt")]
    pub window_end: Option<NaiveTime>,
}

impl Default for SunsetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            latitude: 0.0,
            longitude: 0.0,
            offset_minutes: DEFAULT_SUNSET_OFFSET_MINUTES,
            window_end: None,
        }
    }
}

impl SunsetConfig {
    /// Zero coordinates mean "not configured".
    pub fn has_coordinates(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }
}

/// How the controller is actuated.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControlMethod {
    /// Press a key on a virtual keyboard.
    #[default]
    Keyboard,
    /// Send `NIGHT:ON` / `NIGHT:OFF` over a serial line.
    Serial,
}

impl ControlMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMethod::Keyboard => "keyboard",
            ControlMethod::Serial => "serial",
        }
    }
}

/// Actuation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub method: ControlMethod,
    pub toggle_key: String,
    pub toggle_delay_ms: u64,
    pub serial_port: String,
    pub baud_rate: u32,
    pub serial_timeout_ms: u64,
    /// Belief at startup, for controllers whose state cannot be queried.
    pub initial_state: DeviceStatus,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            method: ControlMethod::default(),
            toggle_key: DEFAULT_TOGGLE_KEY.to_string(),
            toggle_delay_ms: DEFAULT_TOGGLE_DELAY_MS,
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            serial_timeout_ms: DEFAULT_SERIAL_TIMEOUT_MS,
            initial_state: DeviceStatus::Unknown,
        }
    }
}

impl ControllerConfig {
    pub fn toggle_delay(&self) -> Duration {
        Duration::from_millis(self.toggle_delay_ms)
    }

    pub fn serial_timeout(&self) -> Duration {
        Duration::from_millis(self.serial_timeout_ms)
    }
}

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Seconds between schedule evaluations.
    pub check_interval: u64,
    pub sunset_timeout_ms: u64,
    pub debug: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            sunset_timeout_ms: DEFAULT_SUNSET_TIMEOUT_MS,
            debug: false,
        }
    }
}

impl GeneralConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval.max(MINIMUM_CHECK_INTERVAL))
    }

    pub fn sunset_timeout(&self) -> Duration {
        Duration::from_millis(self.sunset_timeout_ms)
    }
}

impl Config {
    /// Parse a TOML document without touching the filesystem.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Print the loaded configuration, showing only what the active settings use.
    pub fn log_config(&self) {
        let schedule = &self.schedule;

        log_block_start!("Loaded configuration");

        if !schedule.enabled {
            log_indented!("Schedule: disabled");
        } else {
            log_indented!(
                "Default window: {} on {}",
                schedule.default_window(),
                format_days(&schedule.active_days)
            );
            if schedule.per_day_enabled {
                let mut days: Vec<_> = schedule.per_day.iter().collect();
                days.sort_by_key(|(day, _)| day.num_days_from_monday());
                for (day, window) in days {
                    log_indented!("Per-day {day}: {window}");
                }
            }
            if schedule.custom_enabled {
                let enabled = schedule.custom.iter().filter(|e| e.enabled).count();
                log_indented!("Custom entries: {enabled} enabled of {}", schedule.custom.len());
            }
            if schedule.sunset.enabled {
                let lat = schedule.sunset.latitude;
                let lon = schedule.sunset.longitude;
                let lat_dir = if lat >= 0.0 { "N" } else { "S" };
                let lon_dir = if lon >= 0.0 { "E" } else { "W" };
                log_indented!(
                    "Sunset: {:.3}°{}, {:.3}°{} offset {:+} min until {}",
                    lat.abs(),
                    lat_dir,
                    lon.abs(),
                    lon_dir,
                    schedule.sunset.offset_minutes,
                    format_time(schedule.sunset_window_end())
                );
            }
        }

        let controller = &self.controller;
        match controller.method {
            ControlMethod::Keyboard => log_indented!(
                "Controller: keyboard ({}, {} ms delay)",
                controller.toggle_key,
                controller.toggle_delay_ms
            ),
            ControlMethod::Serial => log_indented!(
                "Controller: serial ({} @ {} baud)",
                controller.serial_port,
                controller.baud_rate
            ),
        }

        log_indented!(
            "Check interval: {}",
            format_duration_secs(self.general.check_interval)
        );
    }
}

/// Comma-separated short day names in week order, or "every day"/"no days".
pub fn format_days(days: &HashSet<Weekday>) -> String {
    if days.len() == ALL_DAYS.len() {
        return "every day".to_string();
    }
    if days.is_empty() {
        return "no days".to_string();
    }
    ALL_DAYS
        .iter()
        .filter(|day| days.contains(day))
        .map(|day| day.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serde helpers for `HH:MM[:SS]` strings.
pub mod time_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer};

    use crate::common::utils::parse_time_of_day;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_time_of_day(&raw).map_err(serde::de::Error::custom)
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_time_of_day(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
