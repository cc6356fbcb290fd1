//! Local sunset calculation with the `sunrise` crate.

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use super::{SunsetError, SunsetProvider};

/// Computes sunset for the current (possibly simulated) date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolarSunsetProvider;

impl SolarSunsetProvider {
    /// Sunset on `date` as local time of day.
    pub fn sunset_on(
        &self,
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
    ) -> Result<NaiveTime, SunsetError> {
        let coord = Coordinates::new(latitude, longitude)
            .ok_or_else(|| SunsetError::invalid_coordinates(latitude, longitude))?;

        let sunset_utc = SolarDay::new(coord, date).event_time(SolarEvent::Sunset);

        // Polar day or night yields an event far away from the requested date.
        let Some(noon) = date.and_hms_opt(12, 0, 0) else {
            return Err(SunsetError::NoSunset(date));
        };
        let distance = sunset_utc.naive_utc().signed_duration_since(noon);
        if distance.abs() > Duration::hours(36) {
            return Err(SunsetError::NoSunset(date));
        }

        Ok(sunset_utc.with_timezone(&Local).time())
    }
}

impl SunsetProvider for SolarSunsetProvider {
    fn lookup(&self, latitude: f64, longitude: f64) -> Result<NaiveTime, SunsetError> {
        let today = crate::time_source::now().date_naive();
        self.sunset_on(today, latitude, longitude)
    }
}
