//! Runtime descriptor: the JSON file describing a running instance

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SCHEMA_VERSION: u32 = 1;
pub const DESCRIPTOR_FILE: &str = "runtime.json";

/// Operating mode recorded in the descriptor, so a CLI inspecting
/// `runtime.json` knows what kind of process is holding the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Server,
    Worker,
    Combined,
}

/// Persisted alongside the lock file. Created on successful startup,
/// deleted on graceful shutdown or stale-cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeDescriptor {
    pub schema_version: u32,
    pub mode: RuntimeMode,
    pub bind_host: String,
    pub port: u16,
    pub pid: u32,
    pub instance_id: Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub project_root: Option<String>,
    pub project_id: Option<String>,
}

impl RuntimeDescriptor {
    #[must_use]
    pub fn new(mode: RuntimeMode, bind_host: impl Into<String>, port: u16) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            mode,
            bind_host: bind_host.into(),
            port,
            pid: std::process::id(),
            instance_id: Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            project_root: None,
            project_id: None,
        }
    }

    #[must_use]
    pub fn with_project(mut self, project_root: String, project_id: String) -> Self {
        self.project_root = Some(project_root);
        self.project_id = Some(project_id);
        self
    }
}
