//! Clock abstraction so the scheduler can run on real or simulated time.
//!
//! The daemon uses [`RealTimeSource`]. `autonight simulate` installs a
//! [`SimulatedTimeSource`] that jumps forward by exactly the requested sleep, which lets
//! a whole week of schedule ticks run in a fraction of a second.

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration as StdDuration;

static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Trait for abstracting time operations.
pub trait TimeSource: Send + Sync {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;

    /// Sleep for the duration (or pretend to).
    fn sleep(&self, duration: StdDuration);

    /// Whether this source is simulated.
    fn is_simulated(&self) -> bool;

    /// Whether a simulation has reached its end (always false for real time).
    fn is_ended(&self) -> bool {
        false
    }
}

/// Real system clock.
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Fast-forward clock between two instants.
pub struct SimulatedTimeSource {
    current: Mutex<DateTime<Local>>,
    end_time: DateTime<Local>,
}

impl SimulatedTimeSource {
    pub fn new(start_time: DateTime<Local>, end_time: DateTime<Local>) -> Self {
        Self {
            current: Mutex::new(start_time),
            end_time,
        }
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Local> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, duration: StdDuration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        // Steps past the representable range just land on the end.
        let advanced = i64::try_from(duration.as_millis())
            .ok()
            .and_then(ChronoDuration::try_milliseconds)
            .and_then(|step| current.checked_add_signed(step));
        *current = advanced.map_or(self.end_time, |next| next.min(self.end_time));
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.now() >= self.end_time
    }
}

/// Install the global time source. Only the first call has an effect.
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

/// Check if the time source has been initialized.
pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

fn source() -> &'static Arc<dyn TimeSource> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource))
}

/// Current time from the global source.
pub fn now() -> DateTime<Local> {
    source().now()
}

/// Sleep using the global source.
pub fn sleep(duration: StdDuration) {
    source().sleep(duration)
}

/// Check if we're running in simulation mode.
pub fn is_simulated() -> bool {
    source().is_simulated()
}

/// Check if simulation has reached its end time.
pub fn simulation_ended() -> bool {
    source().is_ended()
}

/// Parse `YYYY-MM-DD HH:MM[:SS]` as a local datetime.
pub fn parse_datetime(s: &str) -> Result<DateTime<Local>, String> {
    use chrono::NaiveDateTime;

    let trimmed = s.trim();
    let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M"))
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM[:SS]"))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("'{trimmed}' does not exist in the local timezone"))
}
