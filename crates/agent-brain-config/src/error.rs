//! Configuration error types

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Invalid port number
    #[error("Invalid port: {port}")]
    InvalidPort { port: u16 },

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Value out of the allowed range
    #[error("Value {value} is out of range for {field} (expected {min}-{max})")]
    OutOfRange {
        field: String,
        value: u64,
        min: u64,
        max: u64,
    },

    /// An `embedding`/`summarization`/`reranker`/`storage` provider tag the
    /// registry doesn't recognise
    #[error("Unknown provider '{provider}' for {kind}")]
    UnknownProvider { kind: &'static str, provider: String },

    /// A required API key environment variable is unset
    #[error("Missing API key: environment variable '{0}' is not set")]
    MissingApiKey(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParsing(#[from] serde_yaml::Error),

    /// JSON parsing error (project-level `config.json` overlay)
    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error message, used for conditions not worth their own variant
    #[error("Configuration error: {message}")]
    Generic { message: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
