//! Application-wide constants: defaults, validation limits and protocol strings.

use std::time::Duration;

// # Schedule defaults

pub const DEFAULT_START_TIME: &str = "22:00";
pub const DEFAULT_END_TIME: &str = "08:00";
pub const DEFAULT_SUNSET_OFFSET_MINUTES: i32 = 0;

// # Controller defaults

pub const DEFAULT_TOGGLE_KEY: &str = "F12";
pub const DEFAULT_TOGGLE_DELAY_MS: u64 = 500;
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 1000;

/// Hold time between key down and key up.
pub const KEY_PRESS_DURATION: Duration = Duration::from_millis(50);

/// Name of the uinput device created for keyboard emulation.
pub const VIRTUAL_KEYBOARD_NAME: &str = "autonight virtual keyboard";

// # General defaults

pub const DEFAULT_CHECK_INTERVAL: u64 = 30; // seconds
pub const DEFAULT_SUNSET_TIMEOUT_MS: u64 = 5000;

// # Validation limits

pub const MINIMUM_CHECK_INTERVAL: u64 = 1;
pub const MAXIMUM_CHECK_INTERVAL: u64 = 3600;
pub const MAXIMUM_TOGGLE_DELAY_MS: u64 = 10_000;
pub const MINIMUM_SERIAL_TIMEOUT_MS: u64 = 100;
pub const MAXIMUM_SERIAL_TIMEOUT_MS: u64 = 25_500; // VTIME is a u8 in deciseconds
pub const MAXIMUM_SUNSET_OFFSET_MINUTES: i32 = 720;
pub const SUPPORTED_BAUD_RATES: &[u32] = &[1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

// # Serial protocol

pub const SERIAL_NIGHT_ON: &str = "NIGHT:ON";
pub const SERIAL_NIGHT_OFF: &str = "NIGHT:OFF";
pub const SERIAL_STATUS_QUERY: &str = "STATUS?";

// # Files

pub const CONFIG_DIR_NAME: &str = "autonight";
pub const CONFIG_FILE_NAME: &str = "autonight.toml";
pub const LOCK_FILE_NAME: &str = "autonight.lock";

// # Diagnostics

/// Pause between the toggle and the follow-up status query in `autonight test`.
pub const TEST_SETTLE_TIME: Duration = Duration::from_secs(2);

// # Simulation

pub const DEFAULT_SIMULATION_STEP: u64 = 60; // seconds
pub const MAXIMUM_SIMULATION_STEP: u64 = 7 * 24 * 3600; // one week

// # Exit codes

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
