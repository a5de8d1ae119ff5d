//! Reading and writing the runtime descriptor file

use std::path::Path;

use crate::descriptor::{RuntimeDescriptor, DESCRIPTOR_FILE};
use crate::error::RuntimeResult;

/// Write the runtime descriptor to `<state_dir>/runtime.json`.
///
/// # Errors
/// Returns an error on serialization or filesystem failure.
pub fn write_descriptor(state_dir: &Path, descriptor: &RuntimeDescriptor) -> RuntimeResult<()> {
    let json = serde_json::to_string_pretty(descriptor)?;
    std::fs::write(state_dir.join(DESCRIPTOR_FILE), json)?;
    Ok(())
}

/// Read the runtime descriptor from `<state_dir>/runtime.json`, if present.
#[must_use]
pub fn read_descriptor(state_dir: &Path) -> Option<RuntimeDescriptor> {
    let contents = std::fs::read_to_string(state_dir.join(DESCRIPTOR_FILE)).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Remove the runtime descriptor file, on graceful shutdown or stale cleanup.
///
/// # Errors
/// Returns an error only on unexpected filesystem failure; a missing file
/// is not an error.
pub fn remove_descriptor(state_dir: &Path) -> RuntimeResult<()> {
    let path = state_dir.join(DESCRIPTOR_FILE);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RuntimeMode;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let descriptor = RuntimeDescriptor::new(RuntimeMode::Server, "127.0.0.1", 8000);
        write_descriptor(dir.path(), &descriptor).unwrap();

        let read_back = read_descriptor(dir.path()).unwrap();
        assert_eq!(read_back.pid, descriptor.pid);
        assert_eq!(read_back.port, 8000);

        remove_descriptor(dir.path()).unwrap();
        assert!(read_descriptor(dir.path()).is_none());
    }

    #[test]
    fn missing_descriptor_is_none_not_error() {
        let dir = tempdir().unwrap();
        assert!(read_descriptor(dir.path()).is_none());
    }
}
