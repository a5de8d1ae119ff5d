//! Application bootstrap: service initialisation and dependency wiring,
//! kept separate from `main` so tests can build an `AppState` without a
//! running binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agent_brain_config::ApplicationConfig;
use agent_brain_graph::{ArenaGraphIndex, GraphIndex};
use agent_brain_indexing::{JobStore, Pipeline, Worker, WorkerConfig};
use agent_brain_providers::{build_embedding_provider, build_reranker_provider, build_summarization_provider};
use agent_brain_query::QueryService;
use agent_brain_runtime::{LockGuard, RuntimeDescriptor, RuntimeMode};
use agent_brain_storage::build_storage_backend;
use tracing::info;

use crate::state::AppState;

pub type BootstrapResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Acquire the exclusive per-state-directory lock, cleaning up a stale
/// one first. Returns the guard the caller must hold for the process
/// lifetime.
///
/// # Errors
/// Returns `RuntimeError::Busy` if a live process already holds the lock.
pub fn acquire_runtime_lock(
    state_dir: &Path,
    config: &ApplicationConfig,
) -> Result<LockGuard, agent_brain_runtime::RuntimeError> {
    if agent_brain_runtime::lock::is_stale(state_dir) {
        info!("cleaning up stale runtime lock in {}", state_dir.display());
        agent_brain_runtime::lock::cleanup_if_stale(state_dir)?;
    }
    let descriptor = RuntimeDescriptor::new(RuntimeMode::Combined, &config.server.bind_host, config.server.bind_port);
    agent_brain_runtime::start(state_dir, descriptor)
}

/// Build every long-lived service and wire them into an `AppState`, plus
/// the background `Worker` the caller should spawn separately (keeping
/// "build state" and "start running" distinct steps, mirroring the
/// teacher's `initialize_app_state`/`main` split).
///
/// # Errors
/// Returns an error if the storage backend, any configured provider, or
/// the graph index fails to initialise.
pub async fn initialize_app_state(
    config: ApplicationConfig,
    state_dir: PathBuf,
) -> BootstrapResult<(AppState, Worker)> {
    info!("initializing storage backend...");
    let storage = build_storage_backend(&config.storage, &state_dir).await?;
    storage.initialize().await?;

    info!("initializing embedding provider...");
    let embedder = build_embedding_provider(&config.embedding)?;

    info!("initializing reranker provider...");
    let reranker = build_reranker_provider(&config.reranker)?;

    info!("initializing summarization provider...");
    let summarizer = build_summarization_provider(&config.summarization).ok();

    let graph: Option<Arc<dyn GraphIndex>> = if config.graph.enabled {
        info!(store_type = ?config.graph.store_type, "initializing graph index...");
        let graph_index = match config.graph.store_type {
            agent_brain_config::GraphStoreType::Persisted => {
                let graph_dir = state_dir.join(&config.graph.index_subdir);
                ArenaGraphIndex::open(&graph_dir).await?
            }
            agent_brain_config::GraphStoreType::Simple => ArenaGraphIndex::new(),
        };
        Some(Arc::new(graph_index))
    } else {
        None
    };

    let job_store = JobStore::open(&state_dir).await?;

    let mut pipeline = Pipeline::new(
        Arc::clone(&storage),
        Arc::clone(&embedder),
        config.server.checkpoint_interval,
        config.server.embedding_batch_size,
    );
    if let Some(graph) = graph.clone() {
        pipeline = pipeline.with_graph(graph, config.graph.clone(), summarizer.clone());
    }

    let worker_config = WorkerConfig {
        max_retries: config.server.max_retries,
        retry_base_secs: 2,
        job_timeout_secs: config.server.job_timeout_secs,
        ..WorkerConfig::default()
    };
    let worker = Worker::new(job_store.clone(), pipeline, worker_config);

    let query_service = Arc::new(QueryService::new(
        Arc::clone(&storage),
        embedder,
        reranker,
        graph.clone(),
        config.server.clone(),
        config.reranker.clone(),
        config.graph.clone(),
    ));

    let state = AppState::new(Arc::new(config), storage, job_store, query_service, graph, state_dir);

    info!("application state initialized successfully");
    Ok((state, worker))
}
