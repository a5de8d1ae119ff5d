//! Per-state-directory exclusive lock, PID file, and stale-lock detection
//!
//! One process at a time owns a state directory. Acquisition is
//! non-blocking: if another live process already holds the lock we return
//! `Busy` immediately rather than waiting. A lock is considered stale when
//! its PID file names a process that no longer exists, in which case a
//! caller can clean it up and acquire fresh.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use fs2::FileExt;

use crate::error::{RuntimeError, RuntimeResult};

pub const LOCK_FILE: &str = "agent-brain.lock";
pub const PID_FILE: &str = "agent-brain.pid";

static LOCK_WARNING_SHOWN: AtomicBool = AtomicBool::new(false);

/// A held lock. Dropping (or calling [`LockGuard::release`]) unlocks the
/// file and removes the lock + PID files.
pub struct LockGuard {
    file: File,
    state_dir: std::path::PathBuf,
}

impl LockGuard {
    /// Release the lock and remove the lock/PID files.
    pub fn release(self) {
        // fs2 unlocks automatically on drop of `self.file`, but we still
        // need to remove the on-disk files.
        let _ = fs2::FileExt::unlock(&self.file);
        for name in [LOCK_FILE, PID_FILE] {
            let _ = std::fs::remove_file(self.state_dir.join(name));
        }
        tracing::info!(state_dir = %self.state_dir.display(), "lock released");
    }
}

/// Attempt to acquire the exclusive lock for `state_dir`.
///
/// Non-blocking. Creates `state_dir` if it doesn't exist. Returns
/// `Ok(None)` if the lock is already held by another process (busy, not an
/// error), `Ok(Some(guard))` on success.
///
/// # Errors
/// Returns an error on filesystem failures other than the lock being held.
pub fn acquire(state_dir: &Path) -> RuntimeResult<Option<LockGuard>> {
    std::fs::create_dir_all(state_dir)?;
    let lock_path = state_dir.join(LOCK_FILE);

    if !cfg!(any(unix, windows)) && !LOCK_WARNING_SHOWN.swap(true, Ordering::Relaxed) {
        tracing::warn!(
            "file locking not available on this platform; multiple instances may conflict"
        );
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)?;

    match file.try_lock_exclusive() {
        Ok(()) => {}
        Err(_) => {
            tracing::warn!(path = %lock_path.display(), "lock already held");
            return Ok(None);
        }
    }

    let pid_path = state_dir.join(PID_FILE);
    std::fs::write(&pid_path, std::process::id().to_string())?;

    tracing::info!(path = %lock_path.display(), "lock acquired");
    Ok(Some(LockGuard {
        file,
        state_dir: state_dir.to_path_buf(),
    }))
}

/// Read the PID recorded in `state_dir`'s PID file, if any.
#[must_use]
pub fn read_pid(state_dir: &Path) -> Option<u32> {
    let pid_path = state_dir.join(PID_FILE);
    let mut contents = String::new();
    File::open(pid_path).ok()?.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

/// Is a process with the given PID currently alive?
#[cfg(unix)]
fn process_is_alive(pid: u32) -> bool {
    // Signal 0 performs no-op error checking: ESRCH means the process is
    // gone, EPERM means it exists but we can't signal it (still alive).
    let result = unsafe { libc::kill(i32::try_from(pid).unwrap_or(i32::MAX), 0) };
    if result == 0 {
        return true;
    }
    let errno = std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(0);
    errno == libc::EPERM
}

#[cfg(not(unix))]
fn process_is_alive(_pid: u32) -> bool {
    // No portable liveness check without an extra platform crate; assume
    // alive so we never wrongly steal a live process's lock.
    true
}

/// Is the lock in `state_dir` stale (PID file missing/invalid, or the
/// recorded process no longer exists)?
#[must_use]
pub fn is_stale(state_dir: &Path) -> bool {
    match read_pid(state_dir) {
        None => true,
        Some(pid) => !process_is_alive(pid),
    }
}

/// Remove the lock and PID files, but only if [`is_stale`] says they are
/// stale. Deliberately does not touch the runtime descriptor file - that's
/// the caller's responsibility, to avoid races with a starting server.
pub fn cleanup_if_stale(state_dir: &Path) -> RuntimeResult<()> {
    if !is_stale(state_dir) {
        return Ok(());
    }
    for name in [LOCK_FILE, PID_FILE] {
        let path = state_dir.join(name);
        if path.exists() {
            std::fs::remove_file(&path)?;
            tracing::info!(path = %path.display(), "cleaned stale file");
        }
    }
    Ok(())
}

/// Convenience wrapper returning a typed `Busy` error instead of `Ok(None)`.
///
/// # Errors
/// Returns `RuntimeError::Busy` if another process holds the lock, or an IO
/// error on filesystem failure.
pub fn acquire_or_busy(state_dir: &Path) -> RuntimeResult<LockGuard> {
    acquire(state_dir)?.ok_or_else(|| RuntimeError::Busy {
        path: state_dir.display().to_string(),
    })
}
