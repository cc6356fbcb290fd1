//! Default configuration file generation.
//!
//! The default file is assembled with [`ConfigBuilder`] so that the trailing comments line
//! up no matter how long the values in `constants.rs` are.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;

/// Write a commented default configuration to `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(path, default_config_content())
        .with_context(|| format!("Failed to write default config to {}", path.display()))?;

    Ok(())
}

/// The text of the default configuration file.
pub fn default_config_content() -> String {
    let mut content = ConfigBuilder::new()
        .add_table("schedule", "Schedule")
        .add_setting("enabled", "true", "Evaluate the schedule at all (true/false)")
        .add_setting(
            "start",
            &format!("\"{DEFAULT_START_TIME}\""),
            "Night mode start (HH:MM or HH:MM:SS)",
        )
        .add_setting(
            "end",
            &format!("\"{DEFAULT_END_TIME}\""),
            "Night mode end, may be earlier than start",
        )
        .add_setting(
            "active_days",
            "[\"mon\", \"tue\", \"wed\", \"thu\", \"fri\", \"sat\", \"sun\"]",
            "Days the default window applies to",
        )
        .add_setting(
            "per_day_enabled",
            "false",
            "Use [schedule.per_day.<day>] windows first",
        )
        .add_setting(
            "custom_enabled",
            "false",
            "Use [[schedule.custom]] entries",
        )
        .add_table("schedule.sunset", "Sunset")
        .add_setting("enabled", "false", "Start at local sunset plus an offset")
        .add_setting("latitude", "0.0", "Decimal degrees, north positive")
        .add_setting("longitude", "0.0", "Decimal degrees, east positive")
        .add_setting(
            "offset_minutes",
            &DEFAULT_SUNSET_OFFSET_MINUTES.to_string(),
            &format!(
                "Minutes after sunset (-{MAXIMUM_SUNSET_OFFSET_MINUTES} to {MAXIMUM_SUNSET_OFFSET_MINUTES})"
            ),
        )
        .add_table("controller", "Controller")
        .add_setting("method", "\"keyboard\"", "\"keyboard\" or \"serial\"")
        .add_setting(
            "toggle_key",
            &format!("\"{DEFAULT_TOGGLE_KEY}\""),
            "F1-F12, SPACE, ENTER, ESC, TAB, SHIFT, CTRL or ALT",
        )
        .add_setting(
            "toggle_delay_ms",
            &DEFAULT_TOGGLE_DELAY_MS.to_string(),
            &format!("Pause after each toggle (0-{MAXIMUM_TOGGLE_DELAY_MS})"),
        )
        .add_setting(
            "serial_port",
            &format!("\"{DEFAULT_SERIAL_PORT}\""),
            "Serial device for method = \"serial\"",
        )
        .add_setting(
            "baud_rate",
            &DEFAULT_BAUD_RATE.to_string(),
            "1200, 2400, 4800, 9600, 19200, 38400, 57600 or 115200",
        )
        .add_setting(
            "serial_timeout_ms",
            &DEFAULT_SERIAL_TIMEOUT_MS.to_string(),
            &format!(
                "Read timeout ({MINIMUM_SERIAL_TIMEOUT_MS}-{MAXIMUM_SERIAL_TIMEOUT_MS})"
            ),
        )
        .add_setting(
            "initial_state",
            "\"unknown\"",
            "Assumed state at startup: \"unknown\", \"on\" or \"off\"",
        )
        .add_table("general", "General")
        .add_setting(
            "check_interval",
            &DEFAULT_CHECK_INTERVAL.to_string(),
            &format!(
                "Seconds between evaluations ({MINIMUM_CHECK_INTERVAL}-{MAXIMUM_CHECK_INTERVAL})"
            ),
        )
        .add_setting(
            "sunset_timeout_ms",
            &DEFAULT_SUNSET_TIMEOUT_MS.to_string(),
            "Give up on a sunset lookup after this long",
        )
        .add_setting("debug", "false", "Verbose logging")
        .build();

    content.push_str(
        "\n\n\
         # Per-day windows override everything else on their day:\n\
         # [schedule.per_day.fri]\n\
         # start = \"23:30\"\n\
         # end = \"09:00\"\n\
         \n\
         # Custom entries, checked when custom_enabled = true:\n\
         # [[schedule.custom]]\n\
         # name = \"Movie night\"\n\
         # day = \"sat\"\n\
         # start = \"20:00\"\n\
         # end = \"23:30\"\n",
    );

    content
}

/// Builder for configuration files with aligned trailing comments.
struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Table { header: String, title: String },
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_table(mut self, name: &str, title: &str) -> Self {
        self.entries.push(ConfigEntry::Table {
            header: format!("[{name}]"),
            title: format!("#[{title}]"),
        });
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Table { .. } => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        let mut first_table = true;

        for entry in self.entries {
            match entry {
                ConfigEntry::Table { header, title } => {
                    if !first_table {
                        result.push(String::new());
                    }
                    result.push(title);
                    result.push(header);
                    first_table = false;
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.join("\n")
    }
}
