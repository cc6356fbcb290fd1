//! The scheduling loop.
//!
//! [`SchedulerLoop`] wakes up every `check_interval`, evaluates the schedule against the
//! newest configuration snapshot and hands *changes* of the decision to the
//! [`NightModeController`]. Ticks that reproduce the previous decision do nothing, so a
//! manual toggle made in between is left alone until the schedule itself changes its mind.
//!
//! Everything runs on one thread. Signals (manual toggle, reload, shutdown) arrive over a
//! channel and are handled between ticks, which also makes actuation strictly sequential:
//! scheduled, manual and reload-triggered toggles all go through the same `&mut` controller.
//! A slow sunset lookup delays the current tick; ticks that would have fired meanwhile
//! collapse into the single `recv_timeout` that follows.

pub mod controller;
pub mod edge;

use anyhow::Result;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::backend::{ActuationBackend, BackendError};
use crate::config::{Config, ControllerConfig};
use crate::events::Notification;
use crate::geo::{SunsetError, SunsetProvider};
use crate::io::signals::SignalMessage;
use crate::schedule::{self, LocalMoment};

use controller::{NightModeController, RequestOutcome, ToggleSource};
use edge::EdgeState;

/// Produces a fresh, validated configuration on reload.
pub type ConfigReloader = Box<dyn FnMut() -> Result<Config> + Send>;

/// Builds a backend for a changed `[controller]` section.
pub type BackendFactory =
    Box<dyn FnMut(&ControllerConfig) -> Result<Box<dyn ActuationBackend>, BackendError> + Send>;

/// Builds a sunset provider for a changed lookup timeout.
pub type SunsetFactory = Box<dyn FnMut(Duration) -> Arc<dyn SunsetProvider> + Send>;

/// Everything a [`SchedulerLoop`] needs.
pub struct SchedulerParams {
    pub config: Config,
    pub controller: NightModeController,
    pub sunset: Arc<dyn SunsetProvider>,
    pub signal_receiver: Receiver<SignalMessage>,
    pub reloader: ConfigReloader,
    pub backend_factory: BackendFactory,
    pub sunset_factory: SunsetFactory,
    /// `--debug` was given, so debug output stays on whatever the config says.
    pub debug_forced: bool,
}

pub struct SchedulerLoop {
    config: Config,
    controller: NightModeController,
    sunset: Arc<dyn SunsetProvider>,
    edge: EdgeState,
    signal_receiver: Receiver<SignalMessage>,
    reloader: ConfigReloader,
    backend_factory: BackendFactory,
    sunset_factory: SunsetFactory,
    last_sunset_error: Option<SunsetError>,
    debug_forced: bool,
    debug_enabled: bool,
}

impl SchedulerLoop {
    pub fn new(params: SchedulerParams) -> Self {
        let debug_enabled = params.debug_forced || params.config.general.debug;
        Self {
            config: params.config,
            controller: params.controller,
            sunset: params.sunset,
            edge: EdgeState::new(),
            signal_receiver: params.signal_receiver,
            reloader: params.reloader,
            backend_factory: params.backend_factory,
            sunset_factory: params.sunset_factory,
            last_sunset_error: None,
            debug_forced: params.debug_forced,
            debug_enabled,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &NightModeController {
        &self.controller
    }

    pub fn edge(&self) -> &EdgeState {
        &self.edge
    }

    pub fn sunset(&self) -> &Arc<dyn SunsetProvider> {
        &self.sunset
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    /// Run until a shutdown message arrives or every sender is gone.
    pub fn run(&mut self) -> Result<()> {
        self.controller.notify(Notification::SchedulerStarted {
            interval: self.config.general.check_interval(),
        });

        loop {
            self.tick_at(LocalMoment::now());

            match self
                .signal_receiver
                .recv_timeout(self.config.general.check_interval())
            {
                Ok(SignalMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(message) => self.handle_message(message),
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        self.controller.notify(Notification::SchedulerStopped);
        Ok(())
    }

    /// Handle a non-shutdown message. The caller ticks again right after.
    pub fn handle_message(&mut self, message: SignalMessage) {
        match message {
            SignalMessage::Reload => self.reload_config(),
            SignalMessage::ManualToggle => {
                if let RequestOutcome::Failed(error) = self.controller.toggle_manually()
                    && self.debug_enabled
                {
                    log_pipe!();
                    log_debug!("Manual toggle failed: {error:?}");
                }
            }
            SignalMessage::Shutdown => {}
        }
    }

    /// Evaluate the schedule for `now`.
    ///
    /// Returns the new decision when it differs from the previous tick, after it has been
    /// handed to the controller.
    pub fn tick_at(&mut self, now: LocalMoment) -> Option<bool> {
        if !self.config.schedule.enabled {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Scheduling disabled, skipping tick");
            }
            return None;
        }

        let decision = schedule::evaluate_detailed(&self.config.schedule, now, self.sunset.as_ref());
        self.report_sunset_error(decision.sunset_error.as_ref());

        let desired = self.edge.observe(decision.active)?;

        self.controller.notify(Notification::DecisionChanged {
            desired,
            reason: decision.describe(),
        });
        // A failure is reported by the controller. The edge stays consumed, so the next
        // attempt waits for the next change of the decision or a manual toggle.
        let outcome = self.controller.request_state(desired, ToggleSource::Scheduled);
        if self.debug_enabled {
            log_pipe!();
            log_debug!("Scheduled request finished: {outcome:?}");
        }

        Some(desired)
    }

    fn report_sunset_error(&mut self, error: Option<&SunsetError>) {
        if self.last_sunset_error.as_ref() == error {
            return;
        }
        self.last_sunset_error = error.cloned();

        let text = match error {
            Some(error) => format!("Sunset lookup failed ({error}), using the default window"),
            None => return,
        };
        self.controller.notify(Notification::Status(text));
    }

    fn reload_config(&mut self) {
        let new_config = match (self.reloader)() {
            Ok(config) => config,
            Err(e) => {
                log_pipe!();
                log_warning!("Configuration reload failed: {e:#}");
                log_indented!("Keeping the previous configuration");
                return;
            }
        };

        if new_config == self.config {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Configuration unchanged");
            }
            return;
        }

        if new_config.controller != self.config.controller {
            match (self.backend_factory)(&new_config.controller) {
                Ok(backend) => self.controller.replace_backend(backend),
                Err(e) => {
                    log_pipe!();
                    log_warning!("Cannot switch controller: {e}");
                    log_indented!("Keeping the previous configuration");
                    return;
                }
            }
        }

        if new_config.general.sunset_timeout_ms != self.config.general.sunset_timeout_ms {
            self.sunset = (self.sunset_factory)(new_config.general.sunset_timeout());
            self.last_sunset_error = None;
        }

        self.config = new_config;

        let debug_enabled = self.debug_forced || self.config.general.debug;
        if debug_enabled != self.debug_enabled {
            self.debug_enabled = debug_enabled;
            self.controller.set_debug_enabled(debug_enabled);
        }

        log_block_start!("Configuration reloaded");
        self.config.log_config();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceStatus, MockActuationBackend};
    use crate::events::ChannelObserver;
    use crate::events::Observer;
    use crate::geo::NoSunsetProvider;
    use chrono::{NaiveTime, Weekday};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, Sender};

    fn at(h: u32, m: u32) -> LocalMoment {
        LocalMoment::new(
            Weekday::Wed,
            NaiveTime::from_hms_opt(h, m, 0).expect("valid time"),
        )
    }

    fn mock_backend(toggles: usize) -> MockActuationBackend {
        let mut backend = MockActuationBackend::new();
        backend.expect_query_status().return_const(DeviceStatus::Unknown);
        backend.expect_toggle().times(toggles).returning(|_| Ok(()));
        backend.expect_name().return_const("mock");
        backend
    }

    struct Harness {
        scheduler: SchedulerLoop,
        sender: Sender<SignalMessage>,
        notifications: Receiver<Notification>,
    }

    fn harness(
        backend: MockActuationBackend,
        initial: DeviceStatus,
        reloader: ConfigReloader,
    ) -> Harness {
        crate::common::logger::Log::set_enabled(false);

        let (sender, signal_receiver) = mpsc::channel();
        let (notify_tx, notifications) = mpsc::channel();

        let mut controller = NightModeController::new(Box::new(backend), initial);
        controller.add_observer(Box::new(ChannelObserver::new(notify_tx)));

        let scheduler = SchedulerLoop::new(SchedulerParams {
            config: Config::default(),
            controller,
            sunset: Arc::new(NoSunsetProvider),
            signal_receiver,
            reloader,
            backend_factory: Box::new(replacement_backend),
            sunset_factory: Box::new(|_| Arc::new(NoSunsetProvider)),
            debug_forced: false,
        });

        Harness {
            scheduler,
            sender,
            notifications,
        }
    }

    fn replacement_backend(
        _: &ControllerConfig,
    ) -> Result<Box<dyn ActuationBackend>, BackendError> {
        let mut backend = MockActuationBackend::new();
        backend.expect_query_status().return_const(DeviceStatus::Unknown);
        backend.expect_toggle().returning(|_| Ok(()));
        backend.expect_name().return_const("replacement");
        Ok(Box::new(backend))
    }

    fn no_reload() -> ConfigReloader {
        Box::new(|| anyhow::bail!("no reload in this test"))
    }

    #[test]
    fn test_only_decision_changes_reach_the_controller() {
        let mut h = harness(mock_backend(2), DeviceStatus::Off, no_reload());

        // 22:00-08:00 default window
        assert_eq!(h.scheduler.tick_at(at(21, 0)), Some(false));
        assert_eq!(h.scheduler.tick_at(at(21, 30)), None);
        assert_eq!(h.scheduler.tick_at(at(22, 0)), Some(true));
        assert_eq!(h.scheduler.tick_at(at(23, 0)), None);
        assert_eq!(h.scheduler.tick_at(at(8, 0)), Some(false));

        assert_eq!(h.scheduler.controller().belief().status, DeviceStatus::Off);
    }

    #[test]
    fn test_first_tick_with_matching_belief_does_not_toggle() {
        let mut h = harness(mock_backend(0), DeviceStatus::On, no_reload());
        assert_eq!(h.scheduler.tick_at(at(23, 0)), Some(true));

        let seen: Vec<_> = h.notifications.try_iter().collect();
        assert!(seen.contains(&Notification::AlreadyInState { desired: true }));
    }

    #[test]
    fn test_unknown_state_skips_and_consumes_the_edge() {
        let mut h = harness(mock_backend(0), DeviceStatus::Unknown, no_reload());

        assert_eq!(h.scheduler.tick_at(at(23, 0)), Some(true));
        assert_eq!(h.scheduler.tick_at(at(23, 30)), None);

        let skipped = h
            .notifications
            .try_iter()
            .filter(|n| matches!(n, Notification::Skipped { .. }))
            .count();
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_manual_toggle_is_not_undone_by_the_next_tick() {
        let mut h = harness(mock_backend(2), DeviceStatus::Off, no_reload());

        assert_eq!(h.scheduler.tick_at(at(23, 0)), Some(true));
        h.scheduler.handle_message(SignalMessage::ManualToggle);
        assert_eq!(h.scheduler.controller().belief().status, DeviceStatus::Off);
        assert_eq!(
            h.scheduler.controller().belief().source,
            ToggleSource::Manual
        );

        // Still inside the window: same decision, no edge, no toggle.
        assert_eq!(h.scheduler.tick_at(at(23, 30)), None);
        assert_eq!(h.scheduler.edge().last_decision(), Some(true));
    }

    #[test]
    fn test_disabled_schedule_skips_tick() {
        let reloader: ConfigReloader = Box::new(|| {
            let mut config = Config::default();
            config.schedule.enabled = false;
            Ok(config)
        });
        let mut h = harness(mock_backend(0), DeviceStatus::Off, reloader);

        h.scheduler.handle_message(SignalMessage::Reload);
        assert!(!h.scheduler.config().schedule.enabled);
        assert_eq!(h.scheduler.tick_at(at(23, 0)), None);
        assert_eq!(h.scheduler.edge().last_decision(), None);
    }

    #[test]
    fn test_reload_uses_new_window_on_next_tick() {
        let reloader: ConfigReloader = Box::new(|| {
            let mut config = Config::default();
            config.schedule.start = NaiveTime::from_hms_opt(20, 0, 0).expect("valid time");
            Ok(config)
        });
        let mut h = harness(mock_backend(1), DeviceStatus::Off, reloader);

        assert_eq!(h.scheduler.tick_at(at(21, 0)), Some(false));
        h.scheduler.handle_message(SignalMessage::Reload);
        assert_eq!(h.scheduler.tick_at(at(21, 0)), Some(true));
        assert_eq!(h.scheduler.controller().belief().status, DeviceStatus::On);
    }

    #[test]
    fn test_failed_reload_keeps_previous_config() {
        let mut h = harness(mock_backend(0), DeviceStatus::Off, no_reload());
        h.scheduler.handle_message(SignalMessage::Reload);
        assert_eq!(h.scheduler.config(), &Config::default());
    }

    #[test]
    fn test_controller_change_swaps_backend_and_keeps_belief() {
        let reloader: ConfigReloader = Box::new(|| {
            let mut config = Config::default();
            config.controller.toggle_key = "F11".to_string();
            Ok(config)
        });
        let mut h = harness(mock_backend(0), DeviceStatus::On, reloader);

        h.scheduler.handle_message(SignalMessage::Reload);
        assert_eq!(h.scheduler.controller().backend_name(), "replacement");
        assert_eq!(h.scheduler.controller().belief().status, DeviceStatus::On);
    }

    #[test]
    fn test_sunset_failure_is_reported_once() {
        let mut h = harness(mock_backend(0), DeviceStatus::Off, no_reload());
        h.scheduler.config.schedule.sunset.enabled = true;
        h.scheduler.config.schedule.sunset.latitude = 52.52;
        h.scheduler.config.schedule.sunset.longitude = 13.405;

        // Falls back to the default window.
        assert_eq!(h.scheduler.tick_at(at(21, 0)), Some(false));
        assert_eq!(h.scheduler.tick_at(at(21, 30)), None);

        let reports = h
            .notifications
            .try_iter()
            .filter(|n| matches!(n, Notification::Status(text) if text.contains("Sunset lookup failed")))
            .count();
        assert_eq!(reports, 1);
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let mut h = harness(mock_backend(0), DeviceStatus::Unknown, no_reload());
        h.sender.send(SignalMessage::Shutdown).unwrap();

        h.scheduler.run().unwrap();

        let seen: Vec<_> = h.notifications.try_iter().collect();
        assert!(matches!(seen.first(), Some(Notification::SchedulerStarted { .. })));
        assert_eq!(seen.last(), Some(&Notification::SchedulerStopped));
    }

    #[test]
    fn test_run_stops_when_senders_are_gone() {
        let Harness {
            mut scheduler,
            sender,
            notifications,
        } = harness(mock_backend(0), DeviceStatus::Unknown, no_reload());
        drop(sender);

        scheduler.run().unwrap();
        assert_eq!(
            notifications.try_iter().last(),
            Some(Notification::SchedulerStopped)
        );
    }

    /// Records the debug setting handed to observers.
    struct DebugFlag(Arc<AtomicBool>);

    impl Observer for DebugFlag {
        fn notify(&self, _: &Notification) {}

        fn set_debug_enabled(&self, enabled: bool) {
            self.0.store(enabled, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_reload_rebuilds_sunset_provider_for_new_timeout() {
        let reloader: ConfigReloader = Box::new(|| {
            let mut config = Config::default();
            config.general.sunset_timeout_ms = 50;
            Ok(config)
        });
        let mut h = harness(mock_backend(0), DeviceStatus::Off, reloader);

        let (timeout_tx, timeouts) = mpsc::channel();
        h.scheduler.sunset_factory = Box::new(move |timeout| {
            let _ = timeout_tx.send(timeout);
            Arc::new(NoSunsetProvider)
        });
        let before = Arc::clone(h.scheduler.sunset());

        h.scheduler.handle_message(SignalMessage::Reload);

        assert_eq!(h.scheduler.config().general.sunset_timeout_ms, 50);
        assert!(!Arc::ptr_eq(&before, h.scheduler.sunset()));
        assert_eq!(timeouts.try_recv().ok(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_reload_without_timeout_change_keeps_sunset_provider() {
        let reloader: ConfigReloader = Box::new(|| {
            let mut config = Config::default();
            config.schedule.start = NaiveTime::from_hms_opt(21, 0, 0).expect("valid time");
            Ok(config)
        });
        let mut h = harness(mock_backend(0), DeviceStatus::Off, reloader);
        let before = Arc::clone(h.scheduler.sunset());

        h.scheduler.handle_message(SignalMessage::Reload);
        assert!(Arc::ptr_eq(&before, h.scheduler.sunset()));
    }

    #[test]
    fn test_reload_follows_debug_setting() {
        let reloader: ConfigReloader = Box::new(|| {
            let mut config = Config::default();
            config.general.debug = true;
            Ok(config)
        });
        let mut h = harness(mock_backend(0), DeviceStatus::Off, reloader);
        let flag = Arc::new(AtomicBool::new(false));
        h.scheduler
            .controller
            .add_observer(Box::new(DebugFlag(Arc::clone(&flag))));
        assert!(!h.scheduler.debug_enabled());

        h.scheduler.handle_message(SignalMessage::Reload);
        assert!(h.scheduler.debug_enabled());
        assert!(flag.load(Ordering::SeqCst));
    }
}
