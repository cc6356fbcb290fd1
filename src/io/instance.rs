//! Finding and signalling the running daemon.
//!
//! One-shot commands (`toggle`, `status`, `test`, `reload`) locate the daemon through the
//! lock file written by [`crate::io::lock`] and talk to it with Unix signals.

use anyhow::{Context, Result, bail};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::path::PathBuf;

use crate::io::lock;

/// What the lock file records about its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub pid: u32,
    /// Custom config directory, `None` for the default location.
    pub config_dir: Option<PathBuf>,
}

impl InstanceInfo {
    /// Parse lock file contents: the pid on the first line, an optional config directory
    /// on the second.
    pub fn from_lock_contents(contents: &str) -> Result<Self> {
        let lines: Vec<&str> = contents.trim().lines().collect();

        if lines.is_empty() {
            bail!("Lock file is empty");
        }
        if lines.len() > 2 {
            bail!("Invalid lock file format (expected 1-2 lines)");
        }

        let pid = lines[0]
            .trim()
            .parse::<u32>()
            .context("Invalid PID format in lock file")?;

        let config_dir = lines
            .get(1)
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(PathBuf::from);

        Ok(InstanceInfo { pid, config_dir })
    }

    pub fn to_lock_contents(&self) -> String {
        match &self.config_dir {
            Some(dir) => format!("{}\n{}\n", self.pid, dir.display()),
            None => format!("{}\n\n", self.pid),
        }
    }
}

/// The running daemon, if any.
///
/// Adopts the daemon's config directory so that commands read the same file it does.
pub fn get_running_instance() -> Result<Option<InstanceInfo>> {
    let contents = match std::fs::read_to_string(lock::get_main_lock_path()) {
        Ok(contents) => contents,
        Err(_) => return Ok(None),
    };

    let info = InstanceInfo::from_lock_contents(&contents)?;

    if !is_instance_running(info.pid) {
        return Ok(None);
    }

    if let Some(ref dir) = info.config_dir {
        // Already set when --config was given explicitly.
        let _ = crate::config::set_config_dir(Some(dir.display().to_string()));
    }

    Ok(Some(info))
}

pub fn is_instance_running(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    let raw = i32::try_from(pid).context("PID out of range")?;
    kill(Pid::from_raw(raw), signal)
        .with_context(|| format!("Failed to send {signal} to process {pid}"))
}

/// Ask the daemon to flip night mode (SIGUSR1).
pub fn send_toggle_signal(pid: u32) -> Result<()> {
    send_signal(pid, Signal::SIGUSR1)
}

/// Ask the daemon to re-read its configuration (SIGUSR2).
pub fn send_reload_signal(pid: u32) -> Result<()> {
    send_signal(pid, Signal::SIGUSR2)
}

/// Ask the daemon to exit (SIGTERM).
pub fn terminate_instance(pid: u32) -> Result<()> {
    send_signal(pid, Signal::SIGTERM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_contents_with_config_dir() {
        let info = InstanceInfo {
            pid: 4242,
            config_dir: Some(PathBuf::from("/home/me/.config/autonight-test")),
        };
        let parsed = InstanceInfo::from_lock_contents(&info.to_lock_contents()).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_lock_contents_default_config_dir() {
        let parsed = InstanceInfo::from_lock_contents("1234\n\n").unwrap();
        assert_eq!(parsed.pid, 1234);
        assert_eq!(parsed.config_dir, None);

        let parsed = InstanceInfo::from_lock_contents("1234").unwrap();
        assert_eq!(parsed.config_dir, None);
    }

    #[test]
    fn test_invalid_lock_contents() {
        assert!(InstanceInfo::from_lock_contents("").is_err());
        assert!(InstanceInfo::from_lock_contents("not-a-pid\n").is_err());
        assert!(InstanceInfo::from_lock_contents("1\n/a\nextra").is_err());
    }

    #[test]
    fn test_own_process_is_running() {
        assert!(is_instance_running(std::process::id()));
    }
}
