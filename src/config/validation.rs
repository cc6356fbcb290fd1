//! Configuration validation.
//!
//! Hard errors stop a load (or a hot reload, which then keeps the previous snapshot).
//! Settings that are legal but almost certainly unintended only produce warnings, since
//! the evaluator has a defined answer for all of them.

use anyhow::Result;

use super::{Config, ControlMethod};
use crate::backend::keyboard::key_from_name;
use crate::common::constants::*;

/// Validate a parsed configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_schedule(config)?;
    validate_controller(config)?;
    validate_general(config)?;
    warn_questionable_settings(config);
    Ok(())
}

fn validate_schedule(config: &Config) -> Result<()> {
    let sunset = &config.schedule.sunset;

    if !(-90.0..=90.0).contains(&sunset.latitude) {
        anyhow::bail!(
            "sunset.latitude must be between -90 and 90 degrees (got {})",
            sunset.latitude
        );
    }

    if !(-180.0..=180.0).contains(&sunset.longitude) {
        anyhow::bail!(
            "sunset.longitude must be between -180 and 180 degrees (got {})",
            sunset.longitude
        );
    }

    if sunset.offset_minutes.abs() > MAXIMUM_SUNSET_OFFSET_MINUTES {
        anyhow::bail!(
            "sunset.offset_minutes ({}) must be between -{} and {}",
            sunset.offset_minutes,
            MAXIMUM_SUNSET_OFFSET_MINUTES,
            MAXIMUM_SUNSET_OFFSET_MINUTES
        );
    }

    Ok(())
}

fn validate_controller(config: &Config) -> Result<()> {
    let controller = &config.controller;

    if controller.toggle_delay_ms > MAXIMUM_TOGGLE_DELAY_MS {
        anyhow::bail!(
            "toggle_delay_ms ({}) must not exceed {} milliseconds",
            controller.toggle_delay_ms,
            MAXIMUM_TOGGLE_DELAY_MS
        );
    }

    match controller.method {
        ControlMethod::Keyboard => {
            if key_from_name(&controller.toggle_key).is_none() {
                anyhow::bail!(
                    "toggle_key '{}' is not supported (use F1-F12, SPACE, ENTER, ESC, TAB, SHIFT, CTRL or ALT)",
                    controller.toggle_key
                );
            }
        }
        ControlMethod::Serial => {
            if controller.serial_port.trim().is_empty() {
                anyhow::bail!("serial_port must be set when method = \"serial\"");
            }
            if !SUPPORTED_BAUD_RATES.contains(&controller.baud_rate) {
                anyhow::bail!(
                    "baud_rate {} is not supported (use one of {:?})",
                    controller.baud_rate,
                    SUPPORTED_BAUD_RATES
                );
            }
            if !(MINIMUM_SERIAL_TIMEOUT_MS..=MAXIMUM_SERIAL_TIMEOUT_MS)
                .contains(&controller.serial_timeout_ms)
            {
                anyhow::bail!(
                    "serial_timeout_ms ({}) must be between {} and {} milliseconds",
                    controller.serial_timeout_ms,
                    MINIMUM_SERIAL_TIMEOUT_MS,
                    MAXIMUM_SERIAL_TIMEOUT_MS
                );
            }
        }
    }

    Ok(())
}

fn validate_general(config: &Config) -> Result<()> {
    let interval = config.general.check_interval;
    if !(MINIMUM_CHECK_INTERVAL..=MAXIMUM_CHECK_INTERVAL).contains(&interval) {
        anyhow::bail!(
            "check_interval ({} seconds) must be between {} and {} seconds",
            interval,
            MINIMUM_CHECK_INTERVAL,
            MAXIMUM_CHECK_INTERVAL
        );
    }

    if config.general.sunset_timeout_ms == 0 {
        anyhow::bail!("sunset_timeout_ms must be greater than zero");
    }

    Ok(())
}

/// Collect warnings for legal but suspicious settings.
pub fn questionable_settings(config: &Config) -> Vec<String> {
    let schedule = &config.schedule;
    let mut warnings = Vec::new();

    if schedule.active_days.is_empty() {
        warnings.push("active_days is empty; night mode will never be scheduled".to_string());
    }

    if schedule.default_window().is_empty() {
        warnings.push(format!(
            "Default window {} has zero width and is never active",
            schedule.default_window()
        ));
    }

    if schedule.sunset.enabled && !schedule.sunset.has_coordinates() {
        warnings.push(
            "Sunset mode is enabled but latitude/longitude are zero; it will be ignored"
                .to_string(),
        );
    }

    let claiming_modes = [
        schedule.per_day_enabled && !schedule.per_day.is_empty(),
        schedule.custom_enabled,
        schedule.sunset.enabled && schedule.sunset.has_coordinates(),
    ]
    .iter()
    .filter(|enabled| **enabled)
    .count();
    if claiming_modes > 1 {
        warnings.push(
            "Several schedule modes are enabled; priority is per-day, then custom, then sunset"
                .to_string(),
        );
    }

    for entry in schedule.custom.iter().filter(|e| e.enabled) {
        if entry.window().is_empty() {
            warnings.push(format!(
                "Custom entry '{}' on {} has zero width",
                entry.name, entry.day
            ));
        }
    }

    warnings
}

fn warn_questionable_settings(config: &Config) {
    let warnings = questionable_settings(config);
    if warnings.is_empty() {
        return;
    }
    log_pipe!();
    for warning in warnings {
        log_warning!("{}", warning);
    }
}
