use chrono::{NaiveTime, Weekday};

use autonight::config::Config;
use autonight::geo::{NoSunsetProvider, SunsetError, SunsetProvider};
use autonight::schedule::{self, LocalMoment, ScheduleMode};

struct SunsetAt(NaiveTime);

impl SunsetProvider for SunsetAt {
    fn lookup(&self, _latitude: f64, _longitude: f64) -> Result<NaiveTime, SunsetError> {
        Ok(self.0)
    }
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn at(day: Weekday, h: u32, m: u32) -> LocalMoment {
    LocalMoment::new(day, time(h, m))
}

fn config(toml: &str) -> Config {
    Config::from_toml_str(toml).unwrap()
}

#[test]
fn test_default_overnight_window() {
    let config = config(
        r#"
        [schedule]
        start = "22:00"
        end = "08:00"
        "#,
    );

    let sunset = NoSunsetProvider;
    assert!(schedule::evaluate(&config.schedule, at(Weekday::Tue, 23, 30), &sunset));
    assert!(!schedule::evaluate(&config.schedule, at(Weekday::Tue, 9, 0), &sunset));
    assert!(schedule::evaluate(&config.schedule, at(Weekday::Wed, 7, 59), &sunset));
    assert!(!schedule::evaluate(&config.schedule, at(Weekday::Wed, 8, 0), &sunset));
}

#[test]
fn test_sunset_offset_scenario() {
    let config = config(
        r#"
        [schedule.sunset]
        enabled = true
        latitude = 52.52
        longitude = 13.405
        offset_minutes = 30
        window_end = "07:00"
        "#,
    );

    let sunset = SunsetAt(time(19, 45));
    assert!(!schedule::evaluate(&config.schedule, at(Weekday::Fri, 20, 0), &sunset));
    assert!(!schedule::evaluate(&config.schedule, at(Weekday::Fri, 20, 10), &sunset));
    assert!(schedule::evaluate(&config.schedule, at(Weekday::Fri, 20, 20), &sunset));
    assert!(schedule::evaluate(&config.schedule, at(Weekday::Sat, 6, 59), &sunset));

    let decision = schedule::evaluate_detailed(&config.schedule, at(Weekday::Fri, 20, 20), &sunset);
    assert_eq!(decision.mode(), Some(ScheduleMode::Sunset));
}

#[test]
fn test_per_day_gap_falls_through_to_next_mode() {
    let config = config(
        r#"
        [schedule]
        start = "22:00"
        end = "08:00"
        per_day_enabled = true

        [schedule.per_day.mon]
        start = "18:00"
        end = "06:00"
        "#,
    );

    let sunset = NoSunsetProvider;
    let monday = schedule::evaluate_detailed(&config.schedule, at(Weekday::Mon, 19, 0), &sunset);
    assert!(monday.active);
    assert_eq!(monday.mode(), Some(ScheduleMode::PerDay));

    let tuesday = schedule::evaluate_detailed(&config.schedule, at(Weekday::Tue, 23, 0), &sunset);
    assert!(tuesday.active);
    assert_eq!(tuesday.mode(), Some(ScheduleMode::Default));
}

#[test]
fn test_per_day_wins_over_every_other_mode() {
    let config = config(
        r#"
        [schedule]
        start = "00:00"
        end = "23:59"
        per_day_enabled = true
        custom_enabled = true

        [schedule.per_day.sat]
        start = "01:00"
        end = "02:00"

        [[schedule.custom]]
        name = "All day"
        day = "sat"
        start = "00:00"
        end = "23:59"

        [schedule.sunset]
        enabled = true
        latitude = 52.52
        longitude = 13.405
        "#,
    );

    let sunset = SunsetAt(time(12, 0));
    let decision = schedule::evaluate_detailed(&config.schedule, at(Weekday::Sat, 15, 0), &sunset);
    assert!(!decision.active);
    assert_eq!(decision.mode(), Some(ScheduleMode::PerDay));
}

#[test]
fn test_custom_mode_claims_days_without_entries() {
    let config = config(
        r#"
        [schedule]
        custom_enabled = true

        [[schedule.custom]]
        name = "Movie night"
        day = "sat"
        start = "20:00"
        end = "23:30"
        "#,
    );

    let sunset = NoSunsetProvider;
    assert!(schedule::evaluate(&config.schedule, at(Weekday::Sat, 21, 0), &sunset));

    // Custom mode owns the tick even when nothing matches, the default window is unused.
    let sunday = schedule::evaluate_detailed(&config.schedule, at(Weekday::Sun, 23, 0), &sunset);
    assert!(!sunday.active);
    assert_eq!(sunday.mode(), Some(ScheduleMode::Custom));
}

#[test]
fn test_sunset_failure_falls_back_to_default_window() {
    let config = config(
        r#"
        [schedule]
        start = "22:00"
        end = "08:00"

        [schedule.sunset]
        enabled = true
        latitude = 52.52
        longitude = 13.405
        offset_minutes = -60
        "#,
    );

    let decision =
        schedule::evaluate_detailed(&config.schedule, at(Weekday::Thu, 22, 30), &NoSunsetProvider);
    assert!(decision.active);
    assert!(decision.sunset_error.is_some());
}

#[test]
fn test_no_active_days_is_always_off() {
    let config = config(
        r#"
        [schedule]
        start = "00:00"
        end = "23:59"
        active_days = []
        "#,
    );

    for day in [Weekday::Mon, Weekday::Sat] {
        assert!(!schedule::evaluate(&config.schedule, at(day, 12, 0), &NoSunsetProvider));
    }
}

#[test]
fn test_next_event_text() {
    let config = config(
        r#"
        [schedule]
        start = "22:00"
        end = "08:00"
        "#,
    );

    assert_eq!(
        schedule::next_event(&config.schedule, at(Weekday::Mon, 23, 0)),
        "Night mode ends at 08:00"
    );
    assert_eq!(
        schedule::next_event(&config.schedule, at(Weekday::Mon, 12, 0)),
        "Night mode starts at 22:00"
    );
}
