//! Single-instance-per-state-directory runtime coordination
//!
//! A running Agent Brain process owns its state directory for its
//! lifetime: an exclusive lock file enforces that only one process can
//! hold it at a time, a PID file lets other processes (and the CLI)
//! detect staleness, and a JSON runtime descriptor records how to reach
//! the running instance (bind address, port, mode, instance id).

pub mod descriptor;
pub mod error;
pub mod lock;
pub mod store;

pub use descriptor::{RuntimeDescriptor, RuntimeMode};
pub use error::{RuntimeError, RuntimeResult};
pub use lock::LockGuard;

use std::path::Path;

/// Acquire the lock and write the runtime descriptor in one step - the
/// common path for a server or worker starting up.
///
/// # Errors
/// Returns `RuntimeError::Busy` if another live process holds the lock.
pub fn start(state_dir: &Path, descriptor: RuntimeDescriptor) -> RuntimeResult<LockGuard> {
    let guard = lock::acquire_or_busy(state_dir)?;
    store::write_descriptor(state_dir, &descriptor)?;
    Ok(guard)
}

/// Release the lock and remove the runtime descriptor - the common path
/// for graceful shutdown.
///
/// # Errors
/// Returns an error only on unexpected filesystem failure while removing
/// the descriptor.
pub fn stop(state_dir: &Path, guard: LockGuard) -> RuntimeResult<()> {
    store::remove_descriptor(state_dir)?;
    guard.release();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_is_busy() {
        let dir = tempdir().unwrap();
        let guard = lock::acquire(dir.path()).unwrap();
        assert!(guard.is_some());

        let second = lock::acquire(dir.path()).unwrap();
        assert!(second.is_none(), "second acquire should report busy, not succeed");
    }

    #[test]
    fn start_then_stop_round_trips_descriptor() {
        let dir = tempdir().unwrap();
        let descriptor = RuntimeDescriptor::new(RuntimeMode::Combined, "0.0.0.0", 9090);
        let guard = start(dir.path(), descriptor).unwrap();

        assert!(store::read_descriptor(dir.path()).is_some());
        stop(dir.path(), guard).unwrap();
        assert!(store::read_descriptor(dir.path()).is_none());
    }

    #[test]
    fn missing_pid_file_is_stale() {
        let dir = tempdir().unwrap();
        assert!(lock::is_stale(dir.path()));
    }

    #[test]
    fn own_pid_is_never_stale() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join(lock::PID_FILE), std::process::id().to_string()).unwrap();
        assert!(!lock::is_stale(dir.path()));
    }

    /// S6: a PID file naming a process that isn't running is stale, and
    /// cleanup removes both the lock and PID files so a fresh start can
    /// acquire and write a new descriptor.
    #[test]
    fn dead_pid_is_stale_and_cleanup_allows_fresh_acquire() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join(lock::LOCK_FILE), b"").unwrap();
        // PID 1 is init/PID namespace root on every Unix system this runs
        // on; never equal to our own process id, and never exits.
        // Use an implausibly large PID instead, which will not be alive.
        std::fs::write(dir.path().join(lock::PID_FILE), "999999999").unwrap();

        assert!(lock::is_stale(dir.path()));
        lock::cleanup_if_stale(dir.path()).unwrap();
        assert!(!dir.path().join(lock::LOCK_FILE).exists());
        assert!(!dir.path().join(lock::PID_FILE).exists());

        let descriptor = RuntimeDescriptor::new(RuntimeMode::Combined, "127.0.0.1", 8080);
        let guard = start(dir.path(), descriptor).unwrap();
        assert!(store::read_descriptor(dir.path()).is_some());
        stop(dir.path(), guard).unwrap();
    }
}
