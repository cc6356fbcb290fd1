//! Structured logging with box-drawing output.
//!
//! Every status line autonight prints goes through the macros in this module so the
//! daemon, the one-shot commands and the simulator share one visual style:
//!
//! ```text
//! ┏ autonight v0.3.0 ━━╸
//! ┃
//! ┣ Scheduler started
//! ┃   Check interval: 30 seconds
//! ┣[INFO] Night mode enabled (scheduled)
//! ╹
//! ```
//!
//! ## Conventions
//!
//! - `log_block_start!` opens a new conceptual block (scheduler start, config reload,
//!   decision change). It prints a spacer pipe first.
//! - `log_decorated!` continues the current block.
//! - `log_indented!` lists details under the previous line.
//! - `log_pipe!` inserts a spacer before a level-tagged message that starts its own block.
//! - `log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!` carry a
//!   `[LEVEL]` tag instead of box characters.
//! - `log_version!` and `log_end!` frame the whole run.
//!
//! Output can be muted with [`Log::set_enabled`] or redirected to a file with
//! [`Log::start_file_logging`].

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

// Set once when --log is given
static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Entry point for logger state shared by the macros.
pub struct Log;

impl Log {
    /// Enable or disable all log output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Route all further output to `file_path` instead of stdout.
    ///
    /// The file is written by a dedicated thread; keep the returned guard alive for as
    /// long as output should be captured.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => file.write_all(text.as_bytes())?,
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix shown while the simulator drives the clock.
    ///
    /// Returns an empty string for real time so daemon output stays compact.
    pub fn get_timestamp_prefix() -> String {
        if crate::time_source::is_initialized() && crate::time_source::is_simulated() {
            format!("[{}] ", crate::time_source::now().format("%a %H:%M:%S"))
        } else {
            String::new()
        }
    }
}

/// Guard for file logging that flushes and joins the writer thread on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Remove ANSI color sequences (`ESC [ ... m`) so log files stay plain text.
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Write one formatted chunk to the active sink. Public for macro access.
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

/// Shared body of the line macros: `$lead` goes before the message, on every line
/// prefixed with the simulation timestamp.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($lead:expr, $fmt:literal $($arg:tt)*) => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let message = format!($fmt $($arg)*);
            let formatted = format!("{prefix}{}{message}\n", $lead);
            $crate::common::logger::write_output(&formatted);
        }
    }};
    ($lead:expr, $expr:expr) => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let expr = $expr;
            let formatted = format!("{prefix}{}{expr}\n", $lead);
            $crate::common::logger::write_output(&formatted);
        }
    }};
}

/// Log a message that continues the current block.
#[macro_export]
macro_rules! log_decorated {
    ($($t:tt)*) => { $crate::__log_line!("┣ ", $($t)*) };
}

/// Log an indented detail line.
#[macro_export]
macro_rules! log_indented {
    ($($t:tt)*) => { $crate::__log_line!("┃   ", $($t)*) };
}

/// Log an empty spacer line.
#[macro_export]
macro_rules! log_pipe {
    () => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            $crate::common::logger::write_output(&format!("{prefix}┃\n"));
        }
    }};
}

/// Start a new block: spacer pipe, then the message.
#[macro_export]
macro_rules! log_block_start {
    ($($t:tt)*) => {{
        $crate::log_pipe!();
        $crate::__log_line!("┣ ", $($t)*);
    }};
}

/// Log the application header.
#[macro_export]
macro_rules! log_version {
    () => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let version = env!("CARGO_PKG_VERSION");
            $crate::common::logger::write_output(&format!(
                "{prefix}┏ autonight v{version} ━━╸\n"
            ));
        }
    }};
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {{
        use $crate::common::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            $crate::common::logger::write_output(&format!("{prefix}╹\n"));
        }
    }};
}

/// Log an informational message with a green `[INFO]` tag.
#[macro_export]
macro_rules! log_info {
    ($($t:tt)*) => { $crate::__log_line!("┣[\x1b[32mINFO\x1b[0m] ", $($t)*) };
}

/// Log a warning with a yellow `[WARNING]` tag.
#[macro_export]
macro_rules! log_warning {
    ($($t:tt)*) => { $crate::__log_line!("┣[\x1b[33mWARNING\x1b[0m] ", $($t)*) };
}

/// Log an error with a red `[ERROR]` tag.
#[macro_export]
macro_rules! log_error {
    ($($t:tt)*) => { $crate::__log_line!("┣[\x1b[31mERROR\x1b[0m] ", $($t)*) };
}

/// Log an error that terminates the flow, closing the box with `┗`.
#[macro_export]
macro_rules! log_error_exit {
    ($($t:tt)*) => {{
        $crate::log_pipe!();
        $crate::__log_line!("┗[\x1b[31mERROR\x1b[0m] ", $($t)*);
    }};
}

/// Log a debug/operational message.
#[macro_export]
macro_rules! log_debug {
    ($($t:tt)*) => { $crate::__log_line!("┣[\x1b[32mDEBUG\x1b[0m] ", $($t)*) };
}

/// Log a critical message.
#[macro_export]
macro_rules! log_critical {
    ($($t:tt)*) => { $crate::__log_line!("┣[\x1b[31mCRITICAL\x1b[0m] ", $($t)*) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        assert_eq!(strip_ansi_codes("┣[\x1b[32mINFO\x1b[0m] ok"), "┣[INFO] ok");
        assert_eq!(strip_ansi_codes("plain"), "plain");
        // A bare escape without '[' is kept
        assert_eq!(strip_ansi_codes("a\x1bb"), "a\x1bb");
    }
}
