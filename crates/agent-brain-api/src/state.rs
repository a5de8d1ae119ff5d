//! Shared application state handed to every Axum handler.

use std::path::PathBuf;
use std::sync::Arc;

use agent_brain_config::ApplicationConfig;
use agent_brain_graph::GraphIndex;
use agent_brain_indexing::{JobStore, Worker};
use agent_brain_query::QueryService;
use agent_brain_storage::StorageBackend;

/// Everything a handler might need, initialised once at startup and
/// cloned cheaply (every field is an `Arc` or already `Clone`) into each
/// request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApplicationConfig>,
    pub storage: Arc<dyn StorageBackend>,
    pub job_store: JobStore,
    pub query_service: Arc<QueryService>,
    pub graph: Option<Arc<dyn GraphIndex>>,
    pub state_dir: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: Arc<ApplicationConfig>,
        storage: Arc<dyn StorageBackend>,
        job_store: JobStore,
        query_service: Arc<QueryService>,
        graph: Option<Arc<dyn GraphIndex>>,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            config,
            storage,
            job_store,
            query_service,
            graph,
            state_dir,
        }
    }
}

/// Spawns the background worker as a detached task. Kept separate from
/// `AppState` since handlers never talk to the worker directly - they
/// only enqueue into the shared `JobStore` it drains.
pub fn spawn_worker(worker: Worker) -> tokio::task::JoinHandle<()> {
    tokio::spawn(worker.run())
}
