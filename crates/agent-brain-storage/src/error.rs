//! Storage backend error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LMDB/heed error: {0}")]
    Heed(#[from] heed::Error),

    #[error("vector index error: {0}")]
    Arroy(#[from] arroy::Error),

    #[error("keyword index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("query parse error: {0}")]
    QueryParse(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "embedding dimension mismatch: index has {stored} dimensions, current provider has {current}"
    )]
    DimensionMismatch { stored: usize, current: usize },

    #[error(
        "embedding provider mismatch: index was created with {stored_provider}/{stored_model}, \
         current config uses {current_provider}/{current_model}"
    )]
    ProviderMismatch {
        stored_provider: String,
        stored_model: String,
        current_provider: String,
        current_model: String,
    },

    #[error("{0} entries of unequal length passed to upsert_documents")]
    UnequalBatchLengths(&'static str),

    #[error("collection does not exist; call initialize() first")]
    NotInitialized,

    #[error("other storage error: {0}")]
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
