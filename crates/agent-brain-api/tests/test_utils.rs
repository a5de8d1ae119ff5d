//! Integration test utilities: builds an `AppState` wired to the mock
//! provider/storage doubles from `agent-brain-test-utils` instead of a
//! real LMDB/Postgres backend or a real embedding API.

#![allow(dead_code)]

use std::sync::Arc;

use agent_brain_api::state::AppState;
use agent_brain_config::ApplicationConfig;
use agent_brain_indexing::{JobStore, Pipeline, Worker, WorkerConfig};
use agent_brain_providers::EmbeddingProvider;
use agent_brain_query::QueryService;
use agent_brain_storage::StorageBackend;
use agent_brain_test_utils::{MockEmbeddingProvider, MockStorageBackend};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Mock-backed `AppState` plus the temp dir it's rooted in (kept alive for
/// the caller's lifetime) and the `Worker` the caller may spawn to drive
/// jobs to completion.
pub struct TestApp {
    pub state: AppState,
    pub worker: Worker,
    pub _state_dir: tempfile::TempDir,
}

/// Build a fresh `AppState` over an empty `MockStorageBackend` and an
/// 8-dimensional `MockEmbeddingProvider`, with a fast worker poll interval
/// so indexing tests don't wait on the default 500ms tick.
pub async fn test_app() -> TestResult<TestApp> {
    test_app_with_dimensions(8).await
}

pub async fn test_app_with_dimensions(dimensions: usize) -> TestResult<TestApp> {
    let state_dir = agent_brain_test_utils::temp_state_dir();
    let config = ApplicationConfig::default();

    let storage = Arc::new(MockStorageBackend::new()) as Arc<dyn StorageBackend>;
    let embedder = Arc::new(MockEmbeddingProvider::new(dimensions)) as Arc<dyn EmbeddingProvider>;

    let job_store = JobStore::open(state_dir.path()).await?;

    let pipeline = Pipeline::new(Arc::clone(&storage), Arc::clone(&embedder), 50, 100);

    let worker_config = WorkerConfig {
        poll_interval: std::time::Duration::from_millis(10),
        ..WorkerConfig::default()
    };
    let worker = Worker::new(job_store.clone(), pipeline, worker_config);

    let query_service = Arc::new(QueryService::new(
        Arc::clone(&storage),
        embedder,
        None,
        None,
        config.server.clone(),
        config.reranker.clone(),
        config.graph.clone(),
    ));

    let state = AppState::new(
        Arc::new(config),
        storage,
        job_store,
        query_service,
        None,
        state_dir.path().to_path_buf(),
    );

    Ok(TestApp {
        state,
        worker,
        _state_dir: state_dir,
    })
}

/// A temp folder containing a couple of small text/code files, suitable
/// as an `/index/` target.
pub fn sample_folder() -> tempfile::TempDir {
    let dir = agent_brain_test_utils::temp_state_dir();
    std::fs::write(
        dir.path().join("notes.md"),
        "# Project Notes\n\nThe retrieval service embeds documents and answers queries.\n",
    )
    .expect("write notes.md");
    std::fs::write(
        dir.path().join("lib.rs"),
        "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n",
    )
    .expect("write lib.rs");
    dir
}

pub fn folder_path(dir: &tempfile::TempDir) -> String {
    dir.path().to_string_lossy().into_owned()
}

/// Poll `job_store.get(id)` until the job reaches a terminal status or
/// `attempts` polls elapse, returning the last-seen record.
pub async fn wait_for_terminal(
    state: &AppState,
    job_id: uuid::Uuid,
    attempts: usize,
) -> agent_brain_indexing::JobRecord {
    for _ in 0..attempts {
        if let Some(record) = state.job_store.get(job_id).await {
            if record.status.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    state
        .job_store
        .get(job_id)
        .await
        .expect("job must exist after enqueue")
}
