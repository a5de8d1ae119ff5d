//! End-to-end indexing scenarios that need more control over wiring than
//! the HTTP-level tests in `api_routes_test.rs`: a provenance dimension
//! change between indexing and querying, and cancelling a job while the
//! worker is actively running it.

mod test_utils;

use std::sync::Arc;

use agent_brain_config::ApplicationConfig;
use agent_brain_indexing::{JobStore, Pipeline, Worker, WorkerConfig};
use agent_brain_providers::EmbeddingProvider;
use agent_brain_query::{QueryError, QueryMode, QueryRequest, QueryService};
use agent_brain_storage::StorageBackend;
use agent_brain_test_utils::{MockEmbeddingProvider, MockStorageBackend};

use test_utils::{folder_path, sample_folder, wait_for_terminal};

#[tokio::test]
async fn querying_after_embedder_change_reports_dimension_mismatch() -> test_utils::TestResult {
    let state_dir = agent_brain_test_utils::temp_state_dir();
    let dir = sample_folder();
    let config = ApplicationConfig::default();

    let storage = Arc::new(MockStorageBackend::new()) as Arc<dyn StorageBackend>;
    let indexing_embedder = Arc::new(MockEmbeddingProvider::new(8)) as Arc<dyn EmbeddingProvider>;

    let job_store = JobStore::open(state_dir.path()).await?;
    let pipeline = Pipeline::new(Arc::clone(&storage), Arc::clone(&indexing_embedder), 50, 100);
    let worker_config = WorkerConfig {
        poll_interval: std::time::Duration::from_millis(10),
        ..WorkerConfig::default()
    };
    let worker = Worker::new(job_store.clone(), pipeline, worker_config);
    let worker_handle = tokio::spawn(worker.run());

    let job_id = job_store
        .enqueue(
            agent_brain_indexing::Operation::Index,
            agent_brain_indexing::IndexRequest {
                folder_path: folder_path(&dir),
                chunk_size: None,
                chunk_overlap: None,
                recursive: None,
                include_code: None,
            },
            10,
        )
        .await?;

    let app_state = agent_brain_api::state::AppState::new(
        Arc::new(config.clone()),
        Arc::clone(&storage),
        job_store.clone(),
        Arc::new(QueryService::new(
            Arc::clone(&storage),
            Arc::clone(&indexing_embedder),
            None,
            None,
            config.server.clone(),
            config.reranker.clone(),
            config.graph.clone(),
        )),
        None,
        state_dir.path().to_path_buf(),
    );
    let terminal = wait_for_terminal(&app_state, job_id, 200).await;
    assert_eq!(terminal.status, agent_brain_indexing::JobStatus::Completed);
    worker_handle.abort();

    // A differently-dimensioned embedder now backs the query path, as if
    // the configured provider/model had changed since the collection was
    // populated.
    let query_embedder = Arc::new(MockEmbeddingProvider::new(16)) as Arc<dyn EmbeddingProvider>;
    let query_service = QueryService::new(
        storage,
        query_embedder,
        None,
        None,
        config.server.clone(),
        config.reranker.clone(),
        config.graph.clone(),
    );

    let result = query_service
        .query(QueryRequest {
            query: "documents".to_string(),
            top_k: None,
            min_score: None,
            mode: Some(QueryMode::Vector),
            alpha: None,
            filter: None,
            rerank: None,
        })
        .await;

    assert!(matches!(
        result,
        Err(QueryError::DimensionMismatch {
            indexed: 8,
            current: 16
        })
    ));
    Ok(())
}

#[tokio::test]
async fn cancelling_a_running_job_stops_it_cooperatively() -> test_utils::TestResult {
    let state_dir = agent_brain_test_utils::temp_state_dir();

    // A folder with enough files that the checkpoint interval of 1 gives
    // the cancellation watcher a chance to observe the request mid-run.
    let dir = agent_brain_test_utils::temp_state_dir();
    for i in 0..20 {
        std::fs::write(
            dir.path().join(format!("file_{i}.md")),
            format!("# Doc {i}\n\nbody text for document number {i}\n"),
        )?;
    }

    let storage = Arc::new(MockStorageBackend::new()) as Arc<dyn StorageBackend>;
    let embedder = Arc::new(MockEmbeddingProvider::new(8)) as Arc<dyn EmbeddingProvider>;
    let job_store = JobStore::open(state_dir.path()).await?;
    let pipeline = Pipeline::new(Arc::clone(&storage), Arc::clone(&embedder), 1, 1);
    let worker_config = WorkerConfig {
        poll_interval: std::time::Duration::from_millis(5),
        ..WorkerConfig::default()
    };
    let worker = Worker::new(job_store.clone(), pipeline, worker_config);
    let worker_handle = tokio::spawn(worker.run());

    let job_id = job_store
        .enqueue(
            agent_brain_indexing::Operation::Index,
            agent_brain_indexing::IndexRequest {
                folder_path: folder_path(&dir),
                chunk_size: None,
                chunk_overlap: None,
                recursive: None,
                include_code: None,
            },
            10,
        )
        .await?;

    // Give the worker a moment to pick the job up and start running, then
    // request cancellation while it's mid-flight.
    for _ in 0..50 {
        if let Some(record) = job_store.get(job_id).await {
            if record.status == agent_brain_indexing::JobStatus::Running {
                break;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    job_store.cancel(job_id).await?;

    let terminal = wait_for_terminal_raw(&job_store, job_id, 200).await;
    worker_handle.abort();

    assert!(matches!(
        terminal.status,
        agent_brain_indexing::JobStatus::Cancelled
    ));
    Ok(())
}

async fn wait_for_terminal_raw(
    store: &JobStore,
    job_id: uuid::Uuid,
    attempts: usize,
) -> agent_brain_indexing::JobRecord {
    for _ in 0..attempts {
        if let Some(record) = store.get(job_id).await {
            if record.status.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    store.get(job_id).await.expect("job must exist after enqueue")
}
