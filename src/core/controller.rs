//! Night mode controller: turns desired states into actuation while tracking what it
//! believes the device is doing.
//!
//! The device often cannot be asked (keyboard emulation) or does not answer (serial
//! timeouts), so the controller keeps a [`DeviceBelief`] that is updated after every
//! successful actuation and every status query that returned a known state. When the
//! device state cannot be resolved at all, nothing is toggled: a blind toggle would flip
//! a device that may already be in the desired state.

use chrono::{DateTime, Local};
use std::fmt;

use crate::backend::{ActuationBackend, BackendError, DeviceStatus, create_backend};
use crate::config::ControllerConfig;
use crate::events::{LogObserver, Notification, Observer};
use crate::time_source;

/// Who asked for a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleSource {
    Manual,
    Scheduled,
    SystemTest,
}

impl fmt::Display for ToggleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToggleSource::Manual => "manual",
            ToggleSource::Scheduled => "scheduled",
            ToggleSource::SystemTest => "system test",
        })
    }
}

/// The controller's best estimate of the device state. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceBelief {
    pub status: DeviceStatus,
    pub last_checked_at: DateTime<Local>,
    pub last_toggled_at: Option<DateTime<Local>>,
    pub source: ToggleSource,
}

/// Result of [`NightModeController::request_state`].
#[derive(Debug)]
pub enum RequestOutcome {
    /// The backend was toggled and the belief updated.
    Applied,
    /// The device is already in the desired state.
    NoOpAlready,
    /// The device state is unknown, so nothing was done.
    Skipped,
    /// The backend failed; the belief is unchanged.
    Failed(BackendError),
}

impl RequestOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RequestOutcome::Failed(_))
    }
}

/// Owns the backend and the belief. Every actuation goes through `&mut self`.
pub struct NightModeController {
    backend: Box<dyn ActuationBackend>,
    belief: DeviceBelief,
    observers: Vec<Box<dyn Observer>>,
}

impl NightModeController {
    /// Controller with belief `initial`, normally [`DeviceStatus::Unknown`].
    pub fn new(backend: Box<dyn ActuationBackend>, initial: DeviceStatus) -> Self {
        Self {
            backend,
            belief: DeviceBelief {
                status: initial,
                last_checked_at: time_source::now(),
                last_toggled_at: None,
                source: ToggleSource::Scheduled,
            },
            observers: Vec::new(),
        }
    }

    /// Controller for the configured backend, logging through a [`LogObserver`].
    pub fn from_config(config: &ControllerConfig, debug_enabled: bool) -> Result<Self, BackendError> {
        let backend = create_backend(config)?;
        let mut controller = Self::new(backend, config.initial_state);
        controller.add_observer(Box::new(LogObserver::new(debug_enabled)));
        Ok(controller)
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Pass a changed debug setting on to the observers.
    pub fn set_debug_enabled(&self, enabled: bool) {
        for observer in &self.observers {
            observer.set_debug_enabled(enabled);
        }
    }

    /// Deliver a notification to every observer.
    pub fn notify(&self, notification: Notification) {
        for observer in &self.observers {
            observer.notify(&notification);
        }
    }

    pub fn belief(&self) -> &DeviceBelief {
        &self.belief
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn supports_status(&self) -> bool {
        self.backend.supports_status()
    }

    /// Swap the backend after a configuration change. The belief is kept.
    pub fn replace_backend(&mut self, backend: Box<dyn ActuationBackend>) {
        self.backend = backend;
    }

    /// Bring the device to `desired`, toggling at most once.
    pub fn request_state(&mut self, desired: bool, source: ToggleSource) -> RequestOutcome {
        let Some(current) = self.resolve_current() else {
            self.notify(Notification::Skipped { desired });
            return RequestOutcome::Skipped;
        };

        if current == desired {
            self.notify(Notification::AlreadyInState { desired });
            return RequestOutcome::NoOpAlready;
        }

        match self.actuate(desired, source) {
            Ok(()) => {
                self.record(desired, source);
                RequestOutcome::Applied
            }
            Err(error) => RequestOutcome::Failed(error),
        }
    }

    /// Record a toggle the user performed outside the schedule. Does not actuate.
    pub fn report_manual_toggle(&mut self, new_state: bool) {
        self.record(new_state, ToggleSource::Manual);
    }

    /// Flip night mode on user request. An unknown state is taken to be off.
    pub fn toggle_manually(&mut self) -> RequestOutcome {
        let target = !self.resolve_current().unwrap_or(false);
        match self.actuate(target, ToggleSource::Manual) {
            Ok(()) => {
                self.report_manual_toggle(target);
                RequestOutcome::Applied
            }
            Err(error) => RequestOutcome::Failed(error),
        }
    }

    /// Flip night mode once for diagnostics.
    pub fn test_toggle(&mut self) -> RequestOutcome {
        let target = !self.resolve_current().unwrap_or(false);
        match self.actuate(target, ToggleSource::SystemTest) {
            Ok(()) => {
                self.record(target, ToggleSource::SystemTest);
                RequestOutcome::Applied
            }
            Err(error) => RequestOutcome::Failed(error),
        }
    }

    /// Query the device and reconcile the belief without actuating.
    pub fn refresh_status(&mut self) -> DeviceStatus {
        let queried = self.backend.query_status();
        self.belief.last_checked_at = time_source::now();
        if queried != DeviceStatus::Unknown {
            let source = self.belief.source;
            self.set_status(queried, source);
        }
        queried
    }

    /// Current state: the device's answer if it has one, else the belief.
    fn resolve_current(&mut self) -> Option<bool> {
        match self.refresh_status() {
            DeviceStatus::Unknown => self.belief.status.as_active(),
            known => known.as_active(),
        }
    }

    fn actuate(&mut self, target: bool, source: ToggleSource) -> Result<(), BackendError> {
        self.notify(Notification::ToggleAttempt {
            desired: target,
            source,
        });

        match self.backend.toggle(target) {
            Ok(()) => {
                self.notify(Notification::ToggleSucceeded {
                    desired: target,
                    source,
                });
                Ok(())
            }
            Err(error) => {
                self.notify(Notification::ToggleFailed {
                    desired: target,
                    source,
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    fn record(&mut self, active: bool, source: ToggleSource) {
        let now = time_source::now();
        self.belief.last_toggled_at = Some(now);
        self.belief.last_checked_at = now;
        self.set_status(DeviceStatus::from_active(active), source);
    }

    fn set_status(&mut self, status: DeviceStatus, source: ToggleSource) {
        let changed = self.belief.status != status || self.belief.source != source;
        self.belief.status = status;
        self.belief.source = source;
        if changed {
            self.notify(Notification::StateChanged { status, source });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockActuationBackend;
    use crate::events::ChannelObserver;
    use mockall::predicate::eq;
    use std::sync::mpsc;

    fn unknown_status_backend() -> MockActuationBackend {
        let mut backend = MockActuationBackend::new();
        backend
            .expect_query_status()
            .returning(|| DeviceStatus::Unknown);
        backend
    }

    #[test]
    fn test_unknown_status_and_unknown_belief_skips() {
        let mut backend = unknown_status_backend();
        backend.expect_toggle().never();

        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::Unknown);
        assert!(matches!(
            controller.request_state(true, ToggleSource::Scheduled),
            RequestOutcome::Skipped
        ));
        assert_eq!(controller.belief().status, DeviceStatus::Unknown);
        assert_eq!(controller.belief().last_toggled_at, None);
    }

    #[test]
    fn test_second_request_is_noop() {
        let mut backend = unknown_status_backend();
        backend
            .expect_toggle()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));

        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::Off);
        assert!(matches!(
            controller.request_state(true, ToggleSource::Scheduled),
            RequestOutcome::Applied
        ));
        assert_eq!(controller.belief().status, DeviceStatus::On);
        assert_eq!(controller.belief().source, ToggleSource::Scheduled);
        assert!(controller.belief().last_toggled_at.is_some());

        assert!(matches!(
            controller.request_state(true, ToggleSource::Scheduled),
            RequestOutcome::NoOpAlready
        ));
    }

    #[test]
    fn test_queried_status_overrides_belief() {
        let mut backend = MockActuationBackend::new();
        backend.expect_query_status().returning(|| DeviceStatus::On);
        backend.expect_toggle().never();

        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::Off);
        assert!(matches!(
            controller.request_state(true, ToggleSource::Scheduled),
            RequestOutcome::NoOpAlready
        ));
        assert_eq!(controller.belief().status, DeviceStatus::On);
    }

    #[test]
    fn test_queried_status_resolves_unknown_belief() {
        let mut backend = MockActuationBackend::new();
        backend.expect_query_status().returning(|| DeviceStatus::Off);
        backend
            .expect_toggle()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));

        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::Unknown);
        assert!(matches!(
            controller.request_state(true, ToggleSource::Scheduled),
            RequestOutcome::Applied
        ));
    }

    #[test]
    fn test_failure_leaves_belief_untouched() {
        let mut backend = unknown_status_backend();
        backend
            .expect_toggle()
            .times(1)
            .returning(|_| Err(BackendError::NotOpen("/dev/ttyUSB0".to_string())));

        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::Off);
        let before = controller.belief().clone();

        let outcome = controller.request_state(true, ToggleSource::Scheduled);
        assert!(outcome.is_failure());
        assert!(matches!(outcome, RequestOutcome::Failed(BackendError::NotOpen(_))));

        let after = controller.belief();
        assert_eq!(after.status, before.status);
        assert_eq!(after.source, before.source);
        assert_eq!(after.last_toggled_at, before.last_toggled_at);
    }

    #[test]
    fn test_unanswered_query_still_counts_as_checked() {
        let mut controller =
            NightModeController::new(Box::new(unknown_status_backend()), DeviceStatus::On);
        let stale = controller.belief.last_checked_at - chrono::Duration::hours(1);
        controller.belief.last_checked_at = stale;

        assert_eq!(controller.refresh_status(), DeviceStatus::Unknown);
        assert!(controller.belief().last_checked_at > stale);
        assert_eq!(controller.belief().status, DeviceStatus::On);
    }

    #[test]
    fn test_report_manual_toggle_does_not_actuate() {
        let mut backend = MockActuationBackend::new();
        backend.expect_toggle().never();
        backend.expect_query_status().never();

        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::Unknown);
        controller.report_manual_toggle(true);
        assert_eq!(controller.belief().status, DeviceStatus::On);
        assert_eq!(controller.belief().source, ToggleSource::Manual);
    }

    #[test]
    fn test_manual_toggle_from_unknown_turns_on() {
        let mut backend = unknown_status_backend();
        backend
            .expect_toggle()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));
        backend
            .expect_toggle()
            .with(eq(false))
            .times(1)
            .returning(|_| Ok(()));

        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::Unknown);
        assert!(matches!(controller.toggle_manually(), RequestOutcome::Applied));
        assert_eq!(controller.belief().status, DeviceStatus::On);
        assert!(matches!(controller.toggle_manually(), RequestOutcome::Applied));
        assert_eq!(controller.belief().status, DeviceStatus::Off);
        assert_eq!(controller.belief().source, ToggleSource::Manual);
    }

    #[test]
    fn test_system_test_toggle_records_source() {
        let mut backend = unknown_status_backend();
        backend
            .expect_toggle()
            .with(eq(false))
            .times(1)
            .returning(|_| Ok(()));

        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::On);
        assert!(matches!(controller.test_toggle(), RequestOutcome::Applied));
        assert_eq!(controller.belief().status, DeviceStatus::Off);
        assert_eq!(controller.belief().source, ToggleSource::SystemTest);
    }

    #[test]
    fn test_notifications_for_applied_request() {
        let mut backend = unknown_status_backend();
        backend.expect_toggle().returning(|_| Ok(()));

        let (tx, rx) = mpsc::channel();
        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::Off);
        controller.add_observer(Box::new(ChannelObserver::new(tx)));

        controller.request_state(true, ToggleSource::Scheduled);
        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                Notification::ToggleAttempt {
                    desired: true,
                    source: ToggleSource::Scheduled
                },
                Notification::ToggleSucceeded {
                    desired: true,
                    source: ToggleSource::Scheduled
                },
                Notification::StateChanged {
                    status: DeviceStatus::On,
                    source: ToggleSource::Scheduled
                },
            ]
        );
    }

    #[test]
    fn test_skip_is_notified() {
        let mut backend = unknown_status_backend();
        backend.expect_toggle().never();

        let (tx, rx) = mpsc::channel();
        let mut controller = NightModeController::new(Box::new(backend), DeviceStatus::Unknown);
        controller.add_observer(Box::new(ChannelObserver::new(tx)));

        controller.request_state(false, ToggleSource::Scheduled);
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![Notification::Skipped { desired: false }]
        );
    }
}
