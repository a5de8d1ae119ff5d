//! Single FIFO worker: pops PENDING jobs, runs the pipeline, applies
//! retry/backoff/timeout policy, and persists terminal status.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::error::IndexingError;
use crate::models::{JobProgress, JobStatus};
use crate::pipeline::{CancellationProbe, Pipeline, PipelineCheckpoint};
use crate::store::JobStore;

/// Cheap `Arc<AtomicBool>`-backed flag the pipeline polls between files.
/// Flipped by the worker when the store reports `cancel_requested_at`
/// set, or when the job's soft deadline elapses.
struct StoreBackedCancelFlag(Arc<AtomicBool>);

impl CancellationProbe for StoreBackedCancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct WorkerConfig {
    pub max_retries: u32,
    pub retry_base_secs: u64,
    pub job_timeout_secs: u64,
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_secs: 2,
            job_timeout_secs: 7200,
            poll_interval: Duration::from_millis(500),
        }
    }
}

pub struct Worker {
    store: JobStore,
    pipeline: Pipeline,
    config: WorkerConfig,
}

impl Worker {
    #[must_use]
    pub fn new(store: JobStore, pipeline: Pipeline, config: WorkerConfig) -> Self {
        Self {
            store,
            pipeline,
            config,
        }
    }

    /// Run forever: pop the next PENDING job (if any), process it to a
    /// terminal state, then poll again. Intended to be spawned as a
    /// background `tokio::task`.
    pub async fn run(self) {
        loop {
            match self.store.pop_next_pending().await {
                Ok(Some(job)) => self.process(job.id).await,
                Ok(None) => tokio::time::sleep(self.config.poll_interval).await,
                Err(error) => {
                    tracing::error!(%error, "job store error while polling for work");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn process(&self, job_id: Uuid) {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let watcher = self.spawn_cancel_watcher(job_id, Arc::clone(&cancel_flag));

        let request = match self.store.get(job_id).await {
            Some(record) => record.request,
            None => {
                watcher.abort();
                return;
            }
        };

        let mut attempt = 0u32;
        let outcome = loop {
            attempt += 1;
            let probe = StoreBackedCancelFlag(Arc::clone(&cancel_flag));
            let store = self.store.clone();
            let result = self
                .pipeline
                .run(&request, &probe, |checkpoint: PipelineCheckpoint| {
                    let store = store.clone();
                    let id = job_id;
                    tokio::spawn(async move {
                        let _ = store
                            .update(id, |record| {
                                record.progress = JobProgress {
                                    files_processed: checkpoint.files_processed,
                                    files_total: Some(checkpoint.files_total),
                                    chunks_created: checkpoint.chunks_created,
                                    current_file: checkpoint.current_file,
                                    updated_at: chrono::Utc::now(),
                                };
                            })
                            .await;
                    });
                })
                .await;

            match result {
                Ok(outcome) => break Ok(outcome),
                Err(error) if Self::is_transient(&error) && attempt <= self.config.max_retries => {
                    let backoff =
                        self.config.retry_base_secs * 2u64.saturating_pow(attempt.saturating_sub(1));
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        backoff_secs = backoff,
                        %error,
                        "transient indexing error, retrying"
                    );
                    let _ = self
                        .store
                        .update(job_id, |record| record.retry_count = attempt)
                        .await;
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
                Err(error) => break Err(error),
            }
        };

        watcher.abort();
        self.finalize(job_id, outcome).await;
    }

    fn is_transient(error: &IndexingError) -> bool {
        matches!(
            error,
            IndexingError::Provider(agent_brain_providers::ProviderError::RateLimit { .. })
                | IndexingError::Provider(agent_brain_providers::ProviderError::Request { .. })
                | IndexingError::Provider(agent_brain_providers::ProviderError::OllamaConnection { .. })
        )
    }

    async fn finalize(
        &self,
        job_id: Uuid,
        outcome: Result<crate::pipeline::PipelineOutcome, IndexingError>,
    ) {
        let result = self
            .store
            .update(job_id, |record| {
                let now = chrono::Utc::now();
                match &outcome {
                    Ok(o) if o.cancelled => {
                        record.status = JobStatus::Cancelled;
                        record.completed_at = Some(now);
                    }
                    Ok(o) => {
                        record.status = JobStatus::Completed;
                        record.completed_at = Some(now);
                        record.progress.files_processed = o.files_processed;
                        record.progress.chunks_created = o.chunks_created;
                        record.progress.updated_at = now;
                    }
                    Err(IndexingError::Cancelled) => {
                        record.status = JobStatus::Cancelled;
                        record.completed_at = Some(now);
                    }
                    Err(error) => {
                        record.status = JobStatus::Failed;
                        record.completed_at = Some(now);
                        record.error_message = Some(error.to_string());
                    }
                }
            })
            .await;

        if let Err(error) = result {
            tracing::error!(job_id = %job_id, %error, "failed to persist terminal job state");
        }
    }

    /// Spawn a task that flips `flag` once the store reports
    /// `cancel_requested_at` set, or once `job_timeout_secs` elapses.
    fn spawn_cancel_watcher(
        &self,
        job_id: Uuid,
        flag: Arc<AtomicBool>,
    ) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        let timeout = Duration::from_secs(self.config.job_timeout_secs);
        tokio::spawn(async move {
            let deadline = Instant::now() + timeout;
            loop {
                if store.is_cancel_requested(job_id).await {
                    flag.store(true, Ordering::Relaxed);
                    return;
                }
                if Instant::now() >= deadline {
                    flag.store(true, Ordering::Relaxed);
                    let _ = store
                        .update(job_id, |record| {
                            record.cancel_requested_at = Some(chrono::Utc::now());
                            record.error_message = Some("job exceeded its soft deadline".to_string());
                        })
                        .await;
                    return;
                }
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        })
    }
}
