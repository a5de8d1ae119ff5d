//! YAML configuration file discovery
//!
//! Search order mirrors the CLI's own resolution logic so a human running
//! `agent-brain config path` and the server agree on which file is active:
//!
//! 1. `AGENT_BRAIN_CONFIG` environment variable (exact path)
//! 2. `<state_dir>/config.yaml`
//! 3. `<cwd>/config.yaml`
//! 4. walking up from `cwd` looking for `.claude/agent-brain/config.yaml`
//! 5. `~/.agent-brain/config.yaml`
//! 6. XDG: `~/.config/agent-brain/config.yaml`

use std::path::{Path, PathBuf};

const MARKER_RELATIVE_PATH: &str = ".claude/agent-brain/config.yaml";

/// Resolve the first existing configuration file location.
///
/// `state_dir` is the per-instance state directory (may not exist yet;
/// a missing state dir simply means step 2 is skipped). `cwd` lets callers
/// inject the working directory in tests instead of relying on
/// [`std::env::current_dir`].
#[must_use]
pub fn discover_config_path(state_dir: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("AGENT_BRAIN_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.is_file() {
            return Some(path);
        }
    }

    if let Some(state_dir) = state_dir {
        let candidate = state_dir.join("config.yaml");
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let cwd_candidate = cwd.join("config.yaml");
    if cwd_candidate.is_file() {
        return Some(cwd_candidate);
    }

    let mut current = cwd;
    loop {
        let candidate = current.join(MARKER_RELATIVE_PATH);
        if candidate.is_file() {
            return Some(candidate);
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(".agent-brain").join("config.yaml");
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let candidate = config_dir.join("agent-brain").join("config.yaml");
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_cwd_config_when_nothing_overrides_it() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "embedding:\n  model: x\n").unwrap();

        let found = discover_config_path(None, dir.path());
        assert_eq!(found, Some(dir.path().join("config.yaml")));
    }

    #[test]
    fn state_dir_takes_priority_over_cwd() {
        let cwd = tempdir().unwrap();
        let state = tempdir().unwrap();
        std::fs::write(cwd.path().join("config.yaml"), "a: 1").unwrap();
        std::fs::write(state.path().join("config.yaml"), "b: 2").unwrap();

        let found = discover_config_path(Some(state.path()), cwd.path());
        assert_eq!(found, Some(state.path().join("config.yaml")));
    }

    #[test]
    fn returns_none_when_nothing_exists() {
        let dir = tempdir().unwrap();
        // SAFETY: test runs single-threaded within this process's test harness slot.
        unsafe {
            std::env::remove_var("AGENT_BRAIN_CONFIG");
        }
        assert_eq!(discover_config_path(None, dir.path()), None);
    }
}
