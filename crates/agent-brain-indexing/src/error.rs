//! Indexing pipeline / job queue error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("storage error: {0}")]
    Storage(#[from] agent_brain_storage::StorageError),

    #[error("provider error: {0}")]
    Provider(#[from] agent_brain_providers::ProviderError),

    #[error("chunking error: {0}")]
    Chunking(#[from] agent_brain_chunking::ChunkingError),

    #[error("graph index error: {0}")]
    Graph(#[from] agent_brain_graph::GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("queue is full ({max_queue} pending jobs)")]
    QueueFull { max_queue: usize },

    #[error("job {0} not found")]
    NotFound(uuid::Uuid),

    #[error("job {job_id} cannot be cancelled: already {status}")]
    TerminalJob {
        job_id: uuid::Uuid,
        status: &'static str,
    },

    #[error(
        "embedding dimension mismatch: collection has {indexed} dimensions, current provider has {current}"
    )]
    DimensionMismatch { indexed: usize, current: usize },

    #[error("indexing produced no new chunks and processed no files; aborting")]
    NoDelta,

    #[error("folder does not exist or is not readable: {0}")]
    InvalidFolder(String),

    #[error("job cancelled")]
    Cancelled,

    #[error("job exceeded its deadline")]
    TimedOut,
}

pub type IndexingResult<T> = Result<T, IndexingError>;
