//! Provider error taxonomy
//!
//! Mirrors the shape a caller needs to react correctly: a mismatch between
//! the provider that created an index and the one currently configured is
//! a distinct, recoverable condition (re-index with `--force`), as is a
//! rate limit (retry after a delay) - both different from a hard
//! configuration or auth failure.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("[{provider}] configuration error: {message}")]
    Configuration { provider: String, message: String },

    #[error("[{provider}] authentication failed: {message}")]
    Authentication { provider: String, message: String },

    #[error("provider '{0}' is not registered")]
    NotFound(String),

    #[error(
        "provider mismatch: index was created with {indexed_provider}/{indexed_model}, \
         but current config uses {current_provider}/{current_model}; re-index with --force to update"
    )]
    Mismatch {
        current_provider: String,
        current_model: String,
        indexed_provider: String,
        indexed_model: String,
    },

    #[error("[{provider}] rate limit exceeded")]
    RateLimit {
        provider: String,
        retry_after: Option<u64>,
    },

    #[error("[{provider}] model '{model}' not found")]
    ModelNotFound {
        provider: String,
        model: String,
        available: Vec<String>,
    },

    #[error("cannot connect to Ollama at {base_url}: ensure Ollama is running with 'ollama serve'")]
    OllamaConnection { base_url: String },

    #[error("[{provider}] request failed: {source}")]
    Request {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("[{provider}] unexpected response: {message}")]
    Response { provider: String, message: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;
