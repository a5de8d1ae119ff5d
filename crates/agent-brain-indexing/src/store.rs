//! In-memory job store with `jobs.json` persistence.
//!
//! One [`JobStore`] owns every [`JobRecord`] for an instance's lifetime.
//! Mutations go through a single `RwLock`-guarded map so dedupe checks and
//! status transitions never race each other; every mutation is followed by
//! a full-file rewrite of `jobs.json` so a restart can recover job history
//! (recovery itself - resuming RUNNING jobs - is out of scope; a RUNNING
//! job found on disk at startup is surfaced as FAILED in `JobStore::open`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{IndexingError, IndexingResult};
use crate::models::{IndexRequest, JobRecord, JobStatus, Operation};

const JOBS_FILE: &str = "jobs.json";

#[derive(Clone)]
pub struct JobStore {
    inner: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
    path: PathBuf,
}

impl JobStore {
    /// Load `jobs.json` from `state_dir` if present, otherwise start empty.
    ///
    /// # Errors
    /// Returns an error if an existing `jobs.json` fails to parse.
    pub async fn open(state_dir: &Path) -> IndexingResult<Self> {
        let path = state_dir.join(JOBS_FILE);
        let jobs = if path.exists() {
            let contents = tokio::fs::read_to_string(&path).await?;
            let mut records: Vec<JobRecord> = serde_json::from_str(&contents)?;
            for record in &mut records {
                if record.status == JobStatus::Running {
                    record.status = JobStatus::Failed;
                    record.error_message =
                        Some("process restarted while job was running".to_string());
                    record.completed_at = Some(Utc::now());
                }
            }
            records.into_iter().map(|r| (r.id, r)).collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(jobs)),
            path,
        })
    }

    async fn persist(&self, jobs: &HashMap<Uuid, JobRecord>) -> IndexingResult<()> {
        let mut records: Vec<&JobRecord> = jobs.values().collect();
        records.sort_by_key(|r| r.created_at);
        let contents = serde_json::to_string_pretty(&records)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }

    /// Enqueue a new job, or return the id of an existing PENDING/RUNNING
    /// job with the same dedupe key (idempotent enqueue, spec invariant
    /// "at most one RUNNING job per dedupe_key").
    ///
    /// # Errors
    /// Returns `IndexingError::QueueFull` if more than `max_queue` jobs are
    /// currently PENDING.
    pub async fn enqueue(
        &self,
        operation: Operation,
        request: IndexRequest,
        max_queue: usize,
    ) -> IndexingResult<Uuid> {
        let mut jobs = self.inner.write().await;

        let dedupe_key = JobRecord::compute_dedupe_key(
            operation,
            &request.folder_path,
            request.include_code.unwrap_or(true),
        );
        if let Some(existing) = jobs
            .values()
            .find(|j| j.dedupe_key == dedupe_key && !j.status.is_terminal())
        {
            return Ok(existing.id);
        }

        let pending_count = jobs.values().filter(|j| j.status == JobStatus::Pending).count();
        if pending_count >= max_queue {
            return Err(IndexingError::QueueFull { max_queue });
        }

        let record = JobRecord::new(operation, request);
        let id = record.id;
        jobs.insert(id, record);
        self.persist(&jobs).await?;
        Ok(id)
    }

    /// Pop the oldest PENDING job (FIFO by `created_at`) and transition it
    /// to RUNNING, or return `None` if the queue is empty.
    pub async fn pop_next_pending(&self) -> IndexingResult<Option<JobRecord>> {
        let mut jobs = self.inner.write().await;
        let next_id = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| j.created_at)
            .map(|j| j.id);

        let Some(id) = next_id else {
            return Ok(None);
        };
        let record = jobs.get_mut(&id).expect("id came from this map");
        record.status = JobStatus::Running;
        record.started_at = Some(Utc::now());
        let snapshot = record.clone();
        self.persist(&jobs).await?;
        Ok(Some(snapshot))
    }

    pub async fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.inner.read().await.get(&id).cloned()
    }

    pub async fn list(&self, limit: usize, offset: usize) -> (Vec<JobRecord>, usize) {
        let jobs = self.inner.read().await;
        let mut records: Vec<JobRecord> = jobs.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = records.len();
        let page = records.into_iter().skip(offset).take(limit).collect();
        (page, total)
    }

    /// `cancel(id)`: PENDING -> CANCELLED immediately; RUNNING -> set
    /// `cancel_requested`, worker observes it at the next checkpoint;
    /// terminal -> `TerminalJob` conflict.
    ///
    /// # Errors
    /// Returns `IndexingError::NotFound` / `IndexingError::TerminalJob`.
    pub async fn cancel(&self, id: Uuid) -> IndexingResult<JobRecord> {
        let mut jobs = self.inner.write().await;
        let record = jobs.get_mut(&id).ok_or(IndexingError::NotFound(id))?;

        match record.status {
            JobStatus::Pending => {
                record.status = JobStatus::Cancelled;
                record.completed_at = Some(Utc::now());
            }
            JobStatus::Running => {
                record.cancel_requested_at = Some(Utc::now());
            }
            status => {
                return Err(IndexingError::TerminalJob {
                    job_id: id,
                    status: status.as_str(),
                });
            }
        }
        let snapshot = record.clone();
        self.persist(&jobs).await?;
        Ok(snapshot)
    }

    /// Is cancellation requested for `id`? Used by the pipeline's
    /// cooperative cancellation probe.
    pub async fn is_cancel_requested(&self, id: Uuid) -> bool {
        self.inner
            .read()
            .await
            .get(&id)
            .is_some_and(|j| j.cancel_requested_at.is_some())
    }

    /// Apply an in-place mutation to a job record (progress updates,
    /// terminal status transitions) and persist the result.
    pub async fn update<F>(&self, id: Uuid, f: F) -> IndexingResult<()>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut jobs = self.inner.write().await;
        if let Some(record) = jobs.get_mut(&id) {
            f(record);
        }
        self.persist(&jobs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(folder: &str) -> IndexRequest {
        IndexRequest {
            folder_path: folder.to_string(),
            chunk_size: None,
            chunk_overlap: None,
            recursive: None,
            include_code: None,
        }
    }

    #[tokio::test]
    async fn duplicate_enqueue_returns_same_id_while_pending() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();

        let first = store.enqueue(Operation::Index, request("/docs"), 10).await.unwrap();
        let second = store.enqueue(Operation::Index, request("/docs"), 10).await.unwrap();
        assert_eq!(first, second);

        let (jobs, total) = store.list(10, 0).await;
        assert_eq!(total, 1);
        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test]
    async fn distinct_folders_get_distinct_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();

        let a = store.enqueue(Operation::Index, request("/a"), 10).await.unwrap();
        let b = store.enqueue(Operation::Index, request("/b"), 10).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn index_and_index_add_use_distinct_dedupe_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();

        let a = store.enqueue(Operation::Index, request("/docs"), 10).await.unwrap();
        let b = store
            .enqueue(Operation::IndexAdd, request("/docs"), 10)
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn queue_full_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();
        store.enqueue(Operation::Index, request("/a"), 1).await.unwrap();
        let err = store.enqueue(Operation::Index, request("/b"), 1).await;
        assert!(matches!(err, Err(IndexingError::QueueFull { max_queue: 1 })));
    }

    #[tokio::test]
    async fn cancel_pending_job_is_immediate() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();
        let id = store.enqueue(Operation::Index, request("/a"), 10).await.unwrap();
        let record = store.cancel(id).await.unwrap();
        assert_eq!(record.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_terminal_job_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();
        let id = store.enqueue(Operation::Index, request("/a"), 10).await.unwrap();
        store.cancel(id).await.unwrap();
        let err = store.cancel(id).await;
        assert!(matches!(err, Err(IndexingError::TerminalJob { .. })));
    }

    #[tokio::test]
    async fn pop_next_pending_is_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();
        let first = store.enqueue(Operation::Index, request("/a"), 10).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let _second = store.enqueue(Operation::Index, request("/b"), 10).await.unwrap();

        let popped = store.pop_next_pending().await.unwrap().unwrap();
        assert_eq!(popped.id, first);
        assert_eq!(popped.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn restart_marks_running_jobs_failed() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JobStore::open(dir.path()).await.unwrap();
            let id = store.enqueue(Operation::Index, request("/a"), 10).await.unwrap();
            store.pop_next_pending().await.unwrap();
            assert_eq!(store.get(id).await.unwrap().status, JobStatus::Running);
        }

        let reopened = JobStore::open(dir.path()).await.unwrap();
        let (jobs, _) = reopened.list(10, 0).await;
        assert_eq!(jobs[0].status, JobStatus::Failed);
    }
}
