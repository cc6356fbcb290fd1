//! # autonight
//!
//! Switches a device's night mode on a schedule.
//!
//! The library holds everything; `main.rs` only parses arguments and dispatches.
//!
//! - **Schedule**: `schedule` turns the configuration and the current local time into a
//!   single on/off decision (per-day, custom, sunset and default modes).
//! - **Scheduling loop**: `core` runs the periodic ticks, edge detection and the
//!   [`NightModeController`](core::controller::NightModeController) that tracks what the
//!   device is believed to be doing.
//! - **Backends**: `backend` actuates through a virtual keyboard (evdev/uinput) or a serial
//!   line (termios).
//! - **Configuration**: `config` loads, validates, generates and watches `autonight.toml`.
//! - **Geographic**: `geo` provides sunset times with a timeout and a per-day cache.
//! - **Infrastructure**: `io` (signals, lock file, instance lookup), `events`
//!   (notifications), `time_source` (real or simulated clock), `common` (logging,
//!   constants, utilities).

// Logger macros must be available to every module below
#[macro_use]
pub mod common;

pub mod args;
pub mod backend;
pub mod commands;
pub mod config;
pub mod core;
pub mod events;
pub mod geo;
pub mod io;
pub mod schedule;
pub mod time_source;

mod autonight;

pub use autonight::Autonight;
