//! Runtime (lock/descriptor) error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("lock already held for state directory {path}")]
    Busy { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize runtime descriptor: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
