//! One-shot CLI commands.
//!
//! Each command lives in its own submodule. Commands that touch the device first look for
//! a running scheduler: it owns the device, so they either forward the request to it with
//! a signal or refuse.

pub mod help;
pub mod reload;
pub mod simulate;
pub mod status;
pub mod stop;
pub mod toggle;

use anyhow::Result;

use crate::io::instance::{self, InstanceInfo};

/// Find the running scheduler, logging (and otherwise ignoring) a corrupt lock file.
pub(crate) fn running_instance(debug_enabled: bool) -> Option<InstanceInfo> {
    match instance::get_running_instance() {
        Ok(info) => info,
        Err(e) => {
            if debug_enabled {
                log_pipe!();
                log_debug!("Ignoring unreadable lock file: {e}");
            }
            None
        }
    }
}

/// Log that no scheduler is running, with a hint how to start one.
pub(crate) fn log_not_running() -> Result<()> {
    log_pipe!();
    log_warning!("No autonight scheduler is running");
    log_indented!("Start it with: autonight run");
    log_end!();
    Ok(())
}
