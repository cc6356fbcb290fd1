//! Notifications emitted by the scheduler and the controller.
//!
//! They are advisory: observers render or forward them, nothing depends on their delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::backend::DeviceStatus;
use crate::common::utils::format_duration_secs;
use crate::core::controller::ToggleSource;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    SchedulerStarted { interval: Duration },
    SchedulerStopped,
    /// The evaluated decision differs from the previous tick.
    DecisionChanged { desired: bool, reason: String },
    ToggleAttempt { desired: bool, source: ToggleSource },
    ToggleSucceeded { desired: bool, source: ToggleSource },
    ToggleFailed {
        desired: bool,
        source: ToggleSource,
        error: String,
    },
    AlreadyInState { desired: bool },
    /// Nothing was done because the device state is unknown.
    Skipped { desired: bool },
    /// The controller's belief about the device changed.
    StateChanged {
        status: DeviceStatus,
        source: ToggleSource,
    },
    /// Free-form status text.
    Status(String),
}

fn on_off(active: bool) -> &'static str {
    if active { "on" } else { "off" }
}

impl Notification {
    /// One-line description.
    pub fn message(&self) -> String {
        match self {
            Notification::SchedulerStarted { interval } => format!(
                "Scheduler started, checking every {}",
                format_duration_secs(interval.as_secs())
            ),
            Notification::SchedulerStopped => "Scheduler stopped".to_string(),
            Notification::DecisionChanged { desired, reason } => {
                format!("Schedule wants night mode {}: {reason}", on_off(*desired))
            }
            Notification::ToggleAttempt { desired, source } => {
                format!("Switching night mode {} ({source})", on_off(*desired))
            }
            Notification::ToggleSucceeded { desired, .. } => {
                format!("Night mode switched {}", on_off(*desired))
            }
            Notification::ToggleFailed { desired, error, .. } => {
                format!("Failed to switch night mode {}: {error}", on_off(*desired))
            }
            Notification::AlreadyInState { desired } => {
                format!("Night mode already {}", on_off(*desired))
            }
            Notification::Skipped { desired } => format!(
                "Device state unknown, not switching night mode {} blindly",
                on_off(*desired)
            ),
            Notification::StateChanged { status, source } => {
                format!("Night mode is now {status} ({source})")
            }
            Notification::Status(text) => text.clone(),
        }
    }
}

/// Receives notifications.
pub trait Observer: Send {
    fn notify(&self, notification: &Notification);

    /// Follow a changed `debug` setting. Most observers don't care.
    fn set_debug_enabled(&self, _enabled: bool) {}
}

/// Renders notifications with the logger.
pub struct LogObserver {
    debug_enabled: AtomicBool,
}

impl LogObserver {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled: AtomicBool::new(debug_enabled),
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled.load(Ordering::Relaxed)
    }
}

impl Observer for LogObserver {
    fn notify(&self, notification: &Notification) {
        let message = notification.message();
        match notification {
            Notification::SchedulerStarted { .. }
            | Notification::SchedulerStopped
            | Notification::DecisionChanged { .. } => {
                log_block_start!("{message}");
            }
            Notification::ToggleAttempt { .. } | Notification::ToggleSucceeded { .. } => {
                log_indented!("{message}");
            }
            Notification::ToggleFailed { .. } => {
                log_pipe!();
                log_error!("{message}");
            }
            Notification::Skipped { .. } => {
                log_pipe!();
                log_warning!("{message}");
                log_indented!("Toggle once manually (autonight toggle) so the state is known");
            }
            Notification::AlreadyInState { .. } | Notification::StateChanged { .. } => {
                if self.debug_enabled() {
                    log_pipe!();
                    log_debug!("{message}");
                }
            }
            Notification::Status(_) => {
                log_indented!("{message}");
            }
        }
    }

    fn set_debug_enabled(&self, enabled: bool) {
        self.debug_enabled.store(enabled, Ordering::Relaxed);
    }
}

/// Forwards notifications over a channel.
pub struct ChannelObserver {
    sender: Sender<Notification>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<Notification>) -> Self {
        Self { sender }
    }
}

impl Observer for ChannelObserver {
    fn notify(&self, notification: &Notification) {
        // A dropped receiver only means nobody listens anymore.
        let _ = self.sender.send(notification.clone());
    }
}
