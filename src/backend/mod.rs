//! Actuation backends: the ways autonight can flip the device's night mode.
//!
//! Two variants exist behind [`ActuationBackend`]:
//!
//! - [`keyboard::KeyboardBackend`] presses the configured key on a virtual uinput keyboard.
//!   It cannot tell whether night mode is on.
//! - [`serial::SerialBackend`] sends `NIGHT:ON` / `NIGHT:OFF` lines to a microcontroller
//!   and can ask it with `STATUS?`.
//!
//! Both report connection problems through [`BackendError`] so the controller can treat
//! them uniformly.

pub mod keyboard;
pub mod serial;

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::config::{ControlMethod, ControllerConfig};

/// Failure of an actuation or status query.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0} is not open")]
    NotOpen(String),
    #[error("no response within {0} ms")]
    Timeout(u64),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported toggle key '{0}'")]
    InvalidKey(String),
    #[error("device error: {0}")]
    Device(String),
}

/// Night mode state of the device as reported or believed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Unknown,
    On,
    Off,
}

impl DeviceStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            DeviceStatus::On
        } else {
            DeviceStatus::Off
        }
    }

    /// `Some(true)` for on, `Some(false)` for off, `None` when unknown.
    pub fn as_active(&self) -> Option<bool> {
        match self {
            DeviceStatus::Unknown => None,
            DeviceStatus::On => Some(true),
            DeviceStatus::Off => Some(false),
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceStatus::Unknown => "unknown",
            DeviceStatus::On => "on",
            DeviceStatus::Off => "off",
        })
    }
}

/// A mechanism for commanding the device.
///
/// A backend is owned by exactly one controller, so `&mut self` serialises every call.
#[cfg_attr(test, mockall::automock)]
pub trait ActuationBackend: Send {
    /// Flip night mode. `target` is the state the caller wants afterwards; backends that
    /// can only toggle ignore it.
    fn toggle(&mut self, target: bool) -> Result<(), BackendError>;

    /// Ask the device for its state. Backends without a status channel report `Unknown`.
    fn query_status(&mut self) -> DeviceStatus {
        DeviceStatus::Unknown
    }

    /// Whether [`query_status`](Self::query_status) can ever return a known state.
    fn supports_status(&self) -> bool {
        false
    }

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Build the backend selected in the configuration.
pub fn create_backend(
    config: &ControllerConfig,
) -> Result<Box<dyn ActuationBackend>, BackendError> {
    match config.method {
        ControlMethod::Keyboard => Ok(Box::new(keyboard::KeyboardBackend::new(config)?)),
        ControlMethod::Serial => Ok(Box::new(serial::SerialBackend::from_config(config))),
    }
}
