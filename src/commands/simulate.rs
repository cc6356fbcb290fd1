//! `autonight simulate`: dry-run the schedule over a time range.
//!
//! A [`SimulatedTimeSource`] is installed as the process clock and advanced in fixed steps.
//! Each step is evaluated exactly like a scheduler tick, edge detection included, but
//! nothing is actuated. Sunset lookups see the simulated date.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;

use crate::common::utils::format_duration_secs;
use crate::config::{self, ScheduleConfig};
use crate::core::edge::EdgeState;
use crate::geo::{self, SunsetProvider};
use crate::schedule::{self, LocalMoment};
use crate::time_source::{self, SimulatedTimeSource, TimeSource};

/// A decision change found by the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTransition {
    pub at: DateTime<Local>,
    pub active: bool,
    pub reason: String,
}

pub fn handle_simulate_command(
    start_time: String,
    end_time: String,
    step_secs: u64,
    debug_enabled: bool,
) -> Result<()> {
    let start = time_source::parse_datetime(&start_time)
        .map_err(|e| anyhow!("Invalid start time: {e}"))?;
    let end =
        time_source::parse_datetime(&end_time).map_err(|e| anyhow!("Invalid end time: {e}"))?;
    if end <= start {
        bail!("End time must be after start time");
    }

    let config = config::load()?;

    let clock = Arc::new(SimulatedTimeSource::new(start, end));
    time_source::init_time_source(clock.clone());
    if !time_source::is_simulated() {
        bail!("The clock was already in use, cannot simulate");
    }

    log_version!();
    log_block_start!(
        "Simulating {} to {} in steps of {}",
        start.format("%Y-%m-%d %H:%M"),
        end.format("%Y-%m-%d %H:%M"),
        format_duration_secs(step_secs)
    );
    if debug_enabled || config.general.debug {
        config.log_config();
    }

    let sunset = geo::default_provider(config.general.sunset_timeout());
    let transitions = run_simulation(
        &config.schedule,
        sunset.as_ref(),
        clock.as_ref(),
        Duration::from_secs(step_secs),
        |transition| {
            let state = if transition.active { "on" } else { "off" };
            log_decorated!("Night mode {state}: {}", transition.reason);
        },
    );

    log_block_start!("{} decision change(s), nothing was actuated", transitions.len());
    log_end!();
    Ok(())
}

/// Step `clock` to its end, calling `on_transition` for every change of the decision.
///
/// The first evaluation always counts as a change.
pub fn run_simulation<F>(
    config: &ScheduleConfig,
    sunset: &dyn SunsetProvider,
    clock: &dyn TimeSource,
    step: Duration,
    mut on_transition: F,
) -> Vec<SimulatedTransition>
where
    F: FnMut(&SimulatedTransition),
{
    let mut edge = EdgeState::new();
    let mut transitions = Vec::new();

    loop {
        let now = clock.now();
        let decision =
            schedule::evaluate_detailed(config, LocalMoment::from_datetime(&now), sunset);

        if let Some(active) = edge.observe(decision.active) {
            let transition = SimulatedTransition {
                at: now,
                active,
                reason: decision.describe(),
            };
            on_transition(&transition);
            transitions.push(transition);
        }

        if clock.is_ended() {
            break;
        }
        clock.sleep(step);
    }

    transitions
}

pub fn display_help() {
    log_version!();
    log_block_start!("simulate - Dry-run the schedule");
    log_block_start!("Usage: autonight simulate <start> <end> [--step <secs>]");
    log_block_start!("Arguments:");
    log_indented!("start, end    Local times as \"YYYY-MM-DD HH:MM[:SS]\"");
    log_indented!("--step        Seconds between evaluations (default 60, at most one week)");
    log_block_start!("Example:");
    log_indented!("autonight simulate \"2026-01-05 18:00\" \"2026-01-07 10:00\" --step 300");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::NoSunsetProvider;
    use crate::geo::test_support::FixedSunsetProvider;
    use chrono::Timelike;

    fn clock(start: &str, end: &str) -> SimulatedTimeSource {
        SimulatedTimeSource::new(
            time_source::parse_datetime(start).unwrap(),
            time_source::parse_datetime(end).unwrap(),
        )
    }

    #[test]
    fn test_default_window_over_one_night() {
        let config = ScheduleConfig::default();
        let clock = clock("2026-01-05 20:00", "2026-01-06 10:00");

        let transitions = run_simulation(
            &config,
            &NoSunsetProvider,
            &clock,
            Duration::from_secs(60),
            |_| {},
        );

        let summary: Vec<(u32, bool)> = transitions
            .iter()
            .map(|t| (t.at.hour(), t.active))
            .collect();
        assert_eq!(summary, vec![(20, false), (22, true), (8, false)]);
    }

    #[test]
    fn test_callback_sees_every_transition() {
        let config = ScheduleConfig::default();
        let clock = clock("2026-01-05 21:00", "2026-01-05 23:00");

        let mut seen = 0;
        let transitions = run_simulation(
            &config,
            &NoSunsetProvider,
            &clock,
            Duration::from_secs(300),
            |_| seen += 1,
        );
        assert_eq!(seen, transitions.len());
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_sunset_mode_starts_at_sunset_plus_offset() {
        let mut config = ScheduleConfig::default();
        config.sunset.enabled = true;
        config.sunset.latitude = 52.52;
        config.sunset.longitude = 13.405;
        config.sunset.offset_minutes = 30;

        let clock = clock("2026-01-05 18:00", "2026-01-05 21:00");
        let transitions = run_simulation(
            &config,
            &FixedSunsetProvider::at(19, 0),
            &clock,
            Duration::from_secs(60),
            |_| {},
        );

        assert_eq!(transitions.len(), 2);
        assert!(transitions[1].active);
        assert_eq!((transitions[1].at.hour(), transitions[1].at.minute()), (19, 30));
    }

    #[test]
    fn test_disabled_schedule_yields_single_off_decision() {
        let config = ScheduleConfig {
            enabled: false,
            ..ScheduleConfig::default()
        };
        let clock = clock("2026-01-05 20:00", "2026-01-06 10:00");

        let transitions = run_simulation(
            &config,
            &NoSunsetProvider,
            &clock,
            Duration::from_secs(600),
            |_| {},
        );
        assert_eq!(transitions.len(), 1);
        assert!(!transitions[0].active);
    }

    #[test]
    fn test_oversized_step_ends_after_first_decision() {
        let config = ScheduleConfig::default();
        let clock = clock("2026-01-05 20:00", "2026-01-06 10:00");

        let transitions = run_simulation(
            &config,
            &NoSunsetProvider,
            &clock,
            Duration::from_secs(10_000_000_000_000),
            |_| {},
        );

        // One jump lands on the end of the range, which is outside the window again.
        assert_eq!(transitions.len(), 1);
        assert!(!transitions[0].active);
        assert!(clock.is_ended());
    }
}
