//! `autonight stop`: terminate the running scheduler.

use anyhow::{Result, bail};
use std::time::{Duration, Instant};

use crate::io::instance;

const STOP_TIMEOUT: Duration = Duration::from_secs(3);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn handle_stop_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let Some(info) = super::running_instance(debug_enabled) else {
        return super::log_not_running();
    };

    instance::terminate_instance(info.pid)?;
    log_block_start!("Stopping autonight (PID: {})...", info.pid);

    let started = Instant::now();
    while instance::is_instance_running(info.pid) {
        if started.elapsed() >= STOP_TIMEOUT {
            bail!("autonight (PID: {}) did not exit within {:?}", info.pid, STOP_TIMEOUT);
        }
        std::thread::sleep(STOP_POLL_INTERVAL);
    }

    log_decorated!("Stopped");
    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("stop - Stop the running scheduler");
    log_block_start!("Usage: autonight stop");
    log_block_start!("Sends SIGTERM and waits up to three seconds for the process to exit.");
    log_end!();
}
