//! `autonight reload`: make the running scheduler re-read its configuration.

use anyhow::{Context, Result};

use crate::config;
use crate::io::instance;

pub fn handle_reload_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    // Must come first: adopts the scheduler's config directory.
    let Some(info) = super::running_instance(debug_enabled) else {
        return super::log_not_running();
    };

    // Fail here with the parse error instead of letting the scheduler log it.
    config::load().context("The configuration is invalid, not reloading")?;

    instance::send_reload_signal(info.pid)?;
    log_block_start!("Sent reload signal to autonight (PID: {})", info.pid);
    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("reload - Re-read the configuration");
    log_block_start!("Usage: autonight reload");
    log_block_start!("Validates the configuration file, then signals the running scheduler");
    log_indented!("(SIGUSR2). Edits are normally picked up automatically; this forces it.");
    log_end!();
}
