//! Signal handling for the daemon.
//!
//! | signal           | effect                                      |
//! |------------------|---------------------------------------------|
//! | SIGINT, SIGTERM, SIGHUP | stop the scheduler and exit          |
//! | SIGUSR1          | manual toggle (sent by `autonight toggle`)  |
//! | SIGUSR2          | reload the configuration                    |
//!
//! Signals are turned into [`SignalMessage`]s on a dedicated thread and delivered to the
//! scheduler loop over a channel, so all handling happens on the scheduling thread.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2},
    iterator::Signals,
};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Messages for the scheduler loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMessage {
    /// Re-read the configuration before the next tick.
    Reload,
    /// Flip night mode now.
    ManualToggle,
    /// Stop the loop.
    Shutdown,
}

/// Channel endpoints for the scheduler loop.
pub struct SignalState {
    pub signal_receiver: Receiver<SignalMessage>,
    /// For other producers such as the config watcher.
    pub signal_sender: Sender<SignalMessage>,
}

/// Map a received signal to its message.
pub fn message_for_signal(signal: i32) -> Option<SignalMessage> {
    match signal {
        SIGINT | SIGTERM | SIGHUP => Some(SignalMessage::Shutdown),
        SIGUSR1 => Some(SignalMessage::ManualToggle),
        SIGUSR2 => Some(SignalMessage::Reload),
        _ => None,
    }
}

/// Register the handlers and spawn the signal thread.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let (signal_sender, signal_receiver) = mpsc::channel::<SignalMessage>();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1, SIGUSR2])
        .context("failed to register signal handlers")?;

    let sender = signal_sender.clone();

    thread::spawn(move || {
        let mut shutting_down = false;
        for sig in signals.forever() {
            let Some(message) = message_for_signal(sig) else {
                continue;
            };

            match message {
                SignalMessage::Shutdown => {
                    if shutting_down {
                        // Second interrupt while shutting down.
                        log_pipe!();
                        log_warning!("Forced exit");
                        log_end!();
                        std::process::exit(crate::common::constants::EXIT_FAILURE);
                    }
                    shutting_down = true;
                    log_pipe!();
                    log_info!("Received shutdown signal");
                }
                SignalMessage::ManualToggle => {
                    log_pipe!();
                    log_info!("Received toggle request");
                }
                SignalMessage::Reload => {
                    if debug_enabled {
                        log_pipe!();
                        log_debug!("Received reload signal");
                    }
                }
            }

            if sender.send(message).is_err() {
                break;
            }
        }
    });

    Ok(SignalState {
        signal_receiver,
        signal_sender,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_mapping() {
        assert_eq!(message_for_signal(SIGTERM), Some(SignalMessage::Shutdown));
        assert_eq!(message_for_signal(SIGINT), Some(SignalMessage::Shutdown));
        assert_eq!(message_for_signal(SIGUSR1), Some(SignalMessage::ManualToggle));
        assert_eq!(message_for_signal(SIGUSR2), Some(SignalMessage::Reload));
        assert_eq!(message_for_signal(signal_hook::consts::SIGWINCH), None);
    }
}
