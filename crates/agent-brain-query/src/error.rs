//! Query service error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("storage error: {0}")]
    Storage(#[from] agent_brain_storage::StorageError),

    #[error("provider error: {0}")]
    Provider(#[from] agent_brain_providers::ProviderError),

    #[error("graph error: {0}")]
    Graph(#[from] agent_brain_graph::GraphError),

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("query exceeds maximum length of {max} characters")]
    QueryTooLong { max: usize },

    #[error("top_k must be between 1 and {max}")]
    InvalidTopK { max: usize },

    #[error("alpha must be between 0.0 and 1.0")]
    InvalidAlpha,

    #[error("graph mode is disabled for this collection")]
    GraphDisabled,

    #[error("service is not ready: {reason}")]
    NotReady { reason: &'static str },

    #[error("embedding dimension mismatch: collection has {indexed} dimensions, current provider has {current}")]
    DimensionMismatch { indexed: usize, current: usize },
}

pub type QueryResult<T> = Result<T, QueryError>;
