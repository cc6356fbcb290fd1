//! Lock file for single-instance enforcement.
//!
//! The daemon holds an exclusive `fs2` lock on `$XDG_RUNTIME_DIR/autonight.lock` for its
//! whole lifetime. The file carries the information other invocations need to reach it
//! (see [`InstanceInfo`](crate::io::instance::InstanceInfo)).

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::constants::LOCK_FILE_NAME;
use crate::io::instance::{self, InstanceInfo};

/// Held lock. The file is removed when this is dropped.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Path of the daemon's lock file.
pub fn get_main_lock_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join(LOCK_FILE_NAME)
}

/// Acquire the daemon lock at the default location.
///
/// Returns `Ok(None)` when a live instance already holds it.
pub fn acquire_lock() -> Result<Option<LockFile>> {
    acquire_lock_at(&get_main_lock_path())
}

/// Acquire the lock at `lock_path`, reclaiming it if the recorded owner is gone.
pub fn acquire_lock_at(lock_path: &Path) -> Result<Option<LockFile>> {
    if let Some(lock) = try_lock(lock_path)? {
        return Ok(Some(lock));
    }

    if !handle_lock_conflict(lock_path) {
        return Ok(None);
    }

    try_lock(lock_path)
}

fn try_lock(lock_path: &Path) -> Result<Option<LockFile>> {
    // No truncation before the lock is ours, the content belongs to the holder.
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    let info = InstanceInfo {
        pid: std::process::id(),
        config_dir: crate::config::get_custom_config_dir(),
    };

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(info.to_lock_contents().as_bytes())?;
    file.flush()?;

    Ok(Some(LockFile {
        file,
        path: lock_path.to_path_buf(),
    }))
}

/// Decide what to do with a lock somebody else holds.
///
/// Returns `true` when the recorded owner is gone and the file has been removed. Unreadable
/// or partial contents mean the holder is still writing them, so the lock is left alone.
fn handle_lock_conflict(lock_path: &Path) -> bool {
    let Ok(contents) = std::fs::read_to_string(lock_path) else {
        return false;
    };

    match InstanceInfo::from_lock_contents(&contents) {
        Ok(info) if !instance::is_instance_running(info.pid) => {
            log_warning!(
                "Removing stale lock file (process {} no longer running)",
                info.pid
            );
            let _ = std::fs::remove_file(lock_path);
            true
        }
        _ => false,
    }
}
