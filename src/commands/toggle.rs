//! `autonight toggle`: switch night mode now.
//!
//! With a scheduler running the request is forwarded as SIGUSR1 so that the toggle goes
//! through the scheduler's controller and its belief stays right. Otherwise a controller
//! is built for this one toggle.

use anyhow::{Context, Result, bail};

use crate::config;
use crate::core::controller::{NightModeController, RequestOutcome};
use crate::io::{instance, lock};

pub fn handle_toggle_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    if let Some(info) = super::running_instance(debug_enabled) {
        instance::send_toggle_signal(info.pid)?;
        log_block_start!("Sent toggle request to autonight (PID: {})", info.pid);
        log_end!();
        return Ok(());
    }

    let config = config::load()?;
    let debug_enabled = debug_enabled || config.general.debug;

    // Keeps a scheduler from starting while we hold the device.
    let Some(_lock) = lock::acquire_lock()? else {
        bail!("autonight started while preparing the toggle, run the command again");
    };

    let mut controller = NightModeController::from_config(&config.controller, debug_enabled)
        .context("Failed to set up the controller")?;

    match controller.toggle_manually() {
        RequestOutcome::Failed(e) => return Err(e).context("Manual toggle failed"),
        _ => log_block_start!("Night mode is now {}", controller.belief().status),
    }

    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("toggle - Switch night mode now");
    log_block_start!("Usage: autonight toggle");
    log_block_start!("If the scheduler is running, it performs the toggle (SIGUSR1) and keeps");
    log_indented!("it until the schedule's decision changes. Otherwise the configured");
    log_indented!("controller is used directly; an unknown state is treated as off.");
    log_end!();
}
