//! Hot reloading of `autonight.toml`.
//!
//! The watcher only sends [`SignalMessage::Reload`]; the scheduler loop re-reads and
//! validates the file itself, so a broken edit never replaces a working snapshot.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use super::get_config_path;
use crate::common::utils::private_path;
use crate::io::signals::SignalMessage;

/// Editors often write a file in several steps.
const DEBOUNCE_MS: u64 = 500;

/// Watch the configuration file and request reloads on change.
pub fn start_config_watcher(sender: Sender<SignalMessage>, debug_enabled: bool) -> Result<()> {
    let config_path = get_config_path()?;
    ConfigWatcher::new(config_path, sender, debug_enabled).start()
}

/// Monitors one configuration file through its parent directory.
pub struct ConfigWatcher {
    config_path: PathBuf,
    signal_sender: Sender<SignalMessage>,
    debug_enabled: bool,
}

impl ConfigWatcher {
    pub fn new(
        config_path: PathBuf,
        signal_sender: Sender<SignalMessage>,
        debug_enabled: bool,
    ) -> Self {
        Self {
            config_path,
            signal_sender,
            debug_enabled,
        }
    }

    /// Spawn the watcher thread. Returns once watching has started.
    pub fn start(self) -> Result<()> {
        let Some(parent) = self.config_path.parent().map(Path::to_path_buf) else {
            anyhow::bail!(
                "Config path {} has no parent directory",
                private_path(&self.config_path)
            );
        };

        if !parent.exists() {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Config directory missing, hot reload disabled");
            }
            return Ok(());
        }

        let (tx, rx) = std::sync::mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res
                    && matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    )
                {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        // Watching the directory survives editors that replace the file.
        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", parent.display()))?;

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Watching {} for changes", private_path(&self.config_path));
        }

        let ConfigWatcher {
            config_path,
            signal_sender,
            debug_enabled,
        } = self;

        thread::spawn(move || {
            let _watcher = watcher;
            let mut last_reload: Option<Instant> = None;

            for event in rx {
                if !event.paths.iter().any(|p| is_config_event(p, &config_path)) {
                    continue;
                }

                if let Some(last) = last_reload
                    && last.elapsed() < Duration::from_millis(DEBOUNCE_MS)
                {
                    continue;
                }

                if debug_enabled {
                    log_pipe!();
                    log_debug!("Configuration file change detected");
                }

                if signal_sender.send(SignalMessage::Reload).is_err() {
                    break;
                }
                last_reload = Some(Instant::now());
            }
        });

        Ok(())
    }
}

/// Whether a filesystem event path refers to the config file or an editor temp copy of it.
fn is_config_event(event_path: &Path, config_path: &Path) -> bool {
    if event_path == config_path {
        return true;
    }
    if event_path.parent() != config_path.parent() {
        return false;
    }
    match (
        event_path.file_name().and_then(|n| n.to_str()),
        config_path.file_name().and_then(|n| n.to_str()),
    ) {
        (Some(event_name), Some(config_name)) => event_name.starts_with(config_name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_event_matching() {
        let config = Path::new("/home/u/.config/autonight/autonight.toml");
        assert!(is_config_event(config, config));
        assert!(is_config_event(
            Path::new("/home/u/.config/autonight/autonight.toml~"),
            config
        ));
        assert!(!is_config_event(
            Path::new("/home/u/.config/autonight/other.toml"),
            config
        ));
        assert!(!is_config_event(
            Path::new("/tmp/autonight.toml"),
            config
        ));
    }
}
