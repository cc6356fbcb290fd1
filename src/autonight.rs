//! Daemon startup: acquire resources, then hand over to the scheduling loop.
//!
//! Order matters:
//! 1. the lock file, so a second instance stops before touching anything,
//! 2. the configuration (a default file is written on first start),
//! 3. signal handlers and the config watcher, which feed the loop's channel,
//! 4. the controller and the sunset provider.
//!
//! Resources are released in reverse when [`Autonight::run`] returns; the lock file is
//! removed when its guard drops.

use anyhow::{Context, Result, bail};

use crate::{
    backend::create_backend,
    config,
    core::{SchedulerLoop, SchedulerParams, controller::NightModeController},
    geo,
    io::{instance, lock, signals::setup_signal_handler},
};

/// Builder for the daemon.
///
/// ```no_run
/// use autonight::Autonight;
///
/// # fn main() -> anyhow::Result<()> {
/// Autonight::new(false).run()?;
/// # Ok(())
/// # }
/// ```
pub struct Autonight {
    debug_enabled: bool,
}

impl Autonight {
    pub fn new(debug_enabled: bool) -> Self {
        Self { debug_enabled }
    }

    /// Run until SIGINT/SIGTERM.
    pub fn run(self) -> Result<()> {
        log_version!();

        let Some(_lock) = lock::acquire_lock()? else {
            return handle_instance_conflict();
        };

        let config = config::load()?;
        let debug_enabled = self.debug_enabled || config.general.debug;
        if debug_enabled {
            log_pipe!();
            log_debug!("Debug mode enabled");
        }

        let signal_state = setup_signal_handler(debug_enabled)?;

        if let Err(e) =
            config::start_config_watcher(signal_state.signal_sender.clone(), debug_enabled)
        {
            log_pipe!();
            log_warning!("Config file watching unavailable: {e}");
            log_indented!("Use autonight reload after editing the configuration");
        }

        config.log_config();

        let controller = NightModeController::from_config(&config.controller, debug_enabled)
            .context("Failed to set up the controller")?;
        log_block_start!(
            "Controller: {} (initial state {})",
            controller.backend_name(),
            controller.belief().status
        );

        let sunset = geo::default_provider(config.general.sunset_timeout());

        let mut scheduler = SchedulerLoop::new(SchedulerParams {
            config,
            controller,
            sunset,
            signal_receiver: signal_state.signal_receiver,
            reloader: Box::new(config::load),
            backend_factory: Box::new(create_backend),
            sunset_factory: Box::new(geo::default_provider),
            debug_forced: self.debug_enabled,
        });

        scheduler.run()?;

        log_block_start!("Shutting down");
        log_end!();
        Ok(())
    }
}

fn handle_instance_conflict() -> Result<()> {
    let pid = instance::get_running_instance()
        .ok()
        .flatten()
        .map(|info| info.pid.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    log_pipe!();
    log_error!("autonight is already running (PID: {pid})");
    log_block_start!("Did you mean to:");
    log_indented!("• Toggle night mode: autonight toggle");
    log_indented!("• Reload configuration: autonight reload");
    log_indented!("• Inspect the schedule: autonight status");
    bail!("Cannot start, another autonight instance is running")
}
