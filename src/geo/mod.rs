//! Sunset lookups for the sunset-relative schedule.
//!
//! Evaluation only needs one thing from this module: today's local sunset time for a pair
//! of coordinates, or a typed reason why there is none. [`SolarSunsetProvider`] computes it
//! locally, [`TimedSunsetProvider`] bounds any provider with a timeout and
//! [`CachedSunsetProvider`] memoises results per day.

pub mod solar;
pub mod timed;

use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

pub use solar::SolarSunsetProvider;
pub use timed::TimedSunsetProvider;

/// Why a sunset lookup produced no time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SunsetError {
    #[error("invalid coordinates {latitude}, {longitude}")]
    InvalidCoordinates { latitude: String, longitude: String },
    #[error("the sun does not set on {0} at this latitude")]
    NoSunset(NaiveDate),
    #[error("sunset lookup timed out after {0} ms")]
    Timeout(u64),
    #[error("sunset provider stopped without answering")]
    ProviderGone,
}

impl SunsetError {
    pub fn invalid_coordinates(latitude: f64, longitude: f64) -> Self {
        SunsetError::InvalidCoordinates {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        }
    }
}

/// Source of today's sunset time in local wall-clock time.
pub trait SunsetProvider: Send + Sync {
    fn lookup(&self, latitude: f64, longitude: f64) -> Result<NaiveTime, SunsetError>;
}

impl<P: SunsetProvider + ?Sized> SunsetProvider for Arc<P> {
    fn lookup(&self, latitude: f64, longitude: f64) -> Result<NaiveTime, SunsetError> {
        (**self).lookup(latitude, longitude)
    }
}

/// Provider that never answers, for evaluations that must not depend on the sun.
pub struct NoSunsetProvider;

impl SunsetProvider for NoSunsetProvider {
    fn lookup(&self, _latitude: f64, _longitude: f64) -> Result<NaiveTime, SunsetError> {
        Err(SunsetError::ProviderGone)
    }
}

type CacheKey = (NaiveDate, u64, u64);

/// Caches successful lookups per (date, coordinates).
///
/// Failures are not cached so the next tick retries.
pub struct CachedSunsetProvider<P> {
    inner: P,
    cache: Mutex<HashMap<CacheKey, NaiveTime>>,
}

impl<P: SunsetProvider> CachedSunsetProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<P: SunsetProvider> SunsetProvider for CachedSunsetProvider<P> {
    fn lookup(&self, latitude: f64, longitude: f64) -> Result<NaiveTime, SunsetError> {
        let today = crate::time_source::now().date_naive();
        let key = (today, latitude.to_bits(), longitude.to_bits());

        if let Some(time) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(*time);
        }

        let time = self.inner.lookup(latitude, longitude)?;

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        // Only today's entry is ever useful again.
        cache.retain(|(date, _, _), _| *date == today);
        cache.insert(key, time);
        Ok(time)
    }
}

/// Solar calculation bounded by `timeout`, cached per day.
pub fn default_provider(timeout: Duration) -> Arc<dyn SunsetProvider> {
    let timed = TimedSunsetProvider::new(Arc::new(SolarSunsetProvider), timeout);
    Arc::new(CachedSunsetProvider::new(timed))
}


#[cfg(test)]
mod tests {
    use super::test_support::FixedSunsetProvider;
    use super::*;
    use crate::common::constants::test_constants::*;

    #[test]
    fn test_cache_reuses_successful_lookups() {
        let provider = CachedSunsetProvider::new(FixedSunsetProvider::at(19, 45));

        for _ in 0..3 {
            assert_eq!(
                provider.lookup(TEST_LATITUDE, TEST_LONGITUDE).unwrap(),
                NaiveTime::from_hms_opt(19, 45, 0).unwrap()
            );
        }
        assert_eq!(provider.inner.calls(), 1);

        provider.lookup(-33.87, 151.21).unwrap();
        assert_eq!(provider.inner.calls(), 2);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let provider =
            CachedSunsetProvider::new(FixedSunsetProvider::failing(SunsetError::Timeout(10)));

        assert_eq!(
            provider.lookup(TEST_LATITUDE, TEST_LONGITUDE),
            Err(SunsetError::Timeout(10))
        );
        assert!(provider.lookup(TEST_LATITUDE, TEST_LONGITUDE).is_err());
        assert_eq!(provider.inner.calls(), 2);
    }

    #[test]
    fn test_no_sunset_provider_always_fails() {
        assert!(NoSunsetProvider.lookup(TEST_LATITUDE, TEST_LONGITUDE).is_err());
    }
}
