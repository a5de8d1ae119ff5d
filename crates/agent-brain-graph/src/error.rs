//! Graph index error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("graph index is disabled")]
    Disabled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("provider error: {0}")]
    Provider(#[from] agent_brain_providers::ProviderError),

    #[error("entity not found: {0}")]
    EntityNotFound(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
