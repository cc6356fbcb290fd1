//! `autonight status`: what the schedule wants right now and why.

use anyhow::Result;

use crate::backend::DeviceStatus;
use crate::common::utils::format_time;
use crate::config::{self, Config};
use crate::core::controller::NightModeController;
use crate::geo::{self, SunsetProvider};
use crate::schedule::{self, LocalMoment};

pub fn handle_status_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let running = super::running_instance(debug_enabled);
    let config = config::load()?;
    config.log_config();

    let sunset = geo::default_provider(config.general.sunset_timeout());
    log_schedule_status(&config, LocalMoment::now(), sunset.as_ref());

    log_block_start!("Device");
    match running {
        Some(info) => {
            log_indented!("Scheduler: running (PID: {})", info.pid);
            // Querying would compete with the scheduler for the device.
            log_indented!("Status: owned by the running scheduler");
        }
        None => {
            log_indented!("Scheduler: not running");
            log_device_status(&config, debug_enabled || config.general.debug);
        }
    }

    log_end!();
    Ok(())
}

/// Log the decision for `now` together with the next scheduled event.
pub fn log_schedule_status(config: &Config, now: LocalMoment, sunset: &dyn SunsetProvider) {
    let decision = schedule::evaluate_detailed(&config.schedule, now, sunset);

    log_block_start!("Schedule");
    log_indented!("Now: {} {}", now.day, format_time(now.time));
    log_indented!(
        "Active mode: {}",
        decision
            .mode()
            .map(|mode| mode.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    log_indented!("Night mode should be {}", decision.describe());

    let sunset_config = &config.schedule.sunset;
    if config.schedule.enabled && sunset_config.enabled && sunset_config.has_coordinates() {
        match sunset.lookup(sunset_config.latitude, sunset_config.longitude) {
            Ok(time) => log_indented!("Sunset today: {}", format_time(time)),
            Err(e) => log_indented!("Sunset today: unavailable ({e})"),
        }
    }

    log_indented!("{}", schedule::next_event(&config.schedule, now));
}

fn log_device_status(config: &Config, debug_enabled: bool) {
    let mut controller = match NightModeController::from_config(&config.controller, debug_enabled)
    {
        Ok(controller) => controller,
        Err(e) => {
            log_indented!("Controller: unavailable ({e})");
            return;
        }
    };

    log_indented!("Controller: {}", controller.backend_name());

    if !controller.supports_status() {
        log_indented!("Status: unknown (this controller cannot report its state)");
        return;
    }

    match controller.refresh_status() {
        DeviceStatus::Unknown => log_indented!("Status: no answer from the device"),
        status => log_indented!("Status: night mode {status}"),
    }
}
