//! Error types for document loading, language detection, and chunking

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("chunking error: {0}")]
    Chunking(String),

    #[error("token counting error: {0}")]
    TokenCounting(String),
}

pub type ChunkingResult<T> = Result<T, ChunkingError>;
