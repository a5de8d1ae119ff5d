//! Job queue data model: requests, records, progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

/// Whether the folder replaces the collection's content or is added to it.
/// `/index/` resets first; `/index/add` is purely additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Index,
    IndexAdd,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::IndexAdd => "index_add",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IndexRequest {
    pub folder_path: String,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub recursive: Option<bool>,
    pub include_code: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobProgress {
    pub files_processed: usize,
    pub files_total: Option<usize>,
    pub chunks_created: usize,
    pub current_file: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for JobProgress {
    fn default() -> Self {
        Self {
            files_processed: 0,
            files_total: None,
            chunks_created: 0,
            current_file: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobRecord {
    pub id: Uuid,
    pub dedupe_key: String,
    pub operation: Operation,
    pub request: IndexRequest,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: JobProgress,
    pub error_message: Option<String>,
    pub retry_count: u32,
    /// Set by `JobStore::cancel` on a RUNNING job; the worker polls this
    /// at checkpoints and tears the job down cooperatively.
    pub cancel_requested_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    #[must_use]
    pub fn new(operation: Operation, request: IndexRequest) -> Self {
        let dedupe_key = Self::compute_dedupe_key(
            operation,
            &request.folder_path,
            request.include_code.unwrap_or(true),
        );
        Self {
            id: Uuid::new_v4(),
            dedupe_key,
            operation,
            request,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            progress: JobProgress::default(),
            error_message: None,
            retry_count: 0,
            cancel_requested_at: None,
        }
    }

    /// `hash(operation, folder_path, include_code)` - used to collapse
    /// duplicate enqueue requests onto an already-pending/running job.
    #[must_use]
    pub fn compute_dedupe_key(operation: Operation, folder_path: &str, include_code: bool) -> String {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(folder_path.as_bytes());
        hasher.update(b"\0");
        hasher.update([u8::from(include_code)]);
        format!("{:x}", hasher.finalize())
    }
}
