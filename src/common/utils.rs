//! Small helpers shared across modules.

use chrono::{NaiveTime, Timelike};
use std::path::Path;

/// Render a path with the home directory replaced by `~` so logs don't leak usernames.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// Parse a wall-clock time written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| format!("invalid time '{trimmed}' (expected HH:MM or HH:MM:SS)"))
}

/// Format a time of day the way the status messages show it.
pub fn format_time(time: NaiveTime) -> String {
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

/// Render a duration in seconds as `1h 5m`, `3m 20s` or `12s`.
pub fn format_duration_secs(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, _) if seconds > 0 => format!("{minutes}m {seconds}s"),
        (0, _) => format!("{minutes}m"),
        _ => format!("{hours}h {minutes}m"),
    }
}
