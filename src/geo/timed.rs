//! Bounding a sunset lookup with a timeout.

use chrono::NaiveTime;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use super::{SunsetError, SunsetProvider};

/// Runs each lookup on a worker thread and stops waiting after `timeout`.
///
/// A lookup that outlives its timeout keeps running in the background and its answer is
/// discarded; the scheduling tick has already moved on with the fallback.
pub struct TimedSunsetProvider {
    inner: Arc<dyn SunsetProvider>,
    timeout: Duration,
}

impl TimedSunsetProvider {
    pub fn new(inner: Arc<dyn SunsetProvider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl SunsetProvider for TimedSunsetProvider {
    fn lookup(&self, latitude: f64, longitude: f64) -> Result<NaiveTime, SunsetError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);

        thread::Builder::new()
            .name("sunset-lookup".to_string())
            .spawn(move || {
                let _ = tx.send(inner.lookup(latitude, longitude));
            })
            .map_err(|_| SunsetError::ProviderGone)?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                Err(SunsetError::Timeout(self.timeout.as_millis() as u64))
            }
            Err(RecvTimeoutError::Disconnected) => Err(SunsetError::ProviderGone),
        }
    }
}
