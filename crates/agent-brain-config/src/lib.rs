//! Centralized configuration management for Agent Brain
//!
//! Configuration follows a simple hierarchy, evaluated in this order:
//! 1. Safe defaults (defined as constants below)
//! 2. A discovered YAML file (see [`discovery`])
//! 3. Environment variable overrides (highest priority)
//!
//! Every section is optional in the YAML file; an absent section falls back
//! to its defaults. Strict mode (`strict_mode: true`, or
//! `AGENT_BRAIN_STRICT_MODE=1`) turns `Severity::Critical` validation
//! failures into a startup abort instead of a logged warning.

pub mod discovery;
pub mod error;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use validation::{Severity, Validate};

use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

const DEFAULT_EMBEDDING_PROVIDER_MODEL: &str = "text-embedding-3-large";
const DEFAULT_EMBEDDING_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 3072;

const DEFAULT_SUMMARIZATION_MODEL: &str = "claude-haiku-4-5";
const DEFAULT_SUMMARIZATION_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const DEFAULT_RERANKER_MODEL: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";
const DEFAULT_RERANKER_TOP_K_MULTIPLIER: usize = 10;
const DEFAULT_RERANKER_MAX_CANDIDATES: usize = 100;

const DEFAULT_COLLECTION_NAME: &str = "agent_brain_collection";
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_NAME: &str = "agent_brain";
const DEFAULT_DB_USER: &str = "agent_brain";
const DEFAULT_DB_POOL_SIZE: u32 = 5;
const DEFAULT_DB_POOL_MAX_OVERFLOW: u32 = 10;
const DEFAULT_DB_LANGUAGE: &str = "english";
const DEFAULT_HNSW_M: u32 = 16;
const DEFAULT_HNSW_EF_CONSTRUCTION: u32 = 64;

const DEFAULT_API_HOST: &str = "127.0.0.1";
const DEFAULT_API_PORT: u16 = 8000;

const DEFAULT_MIN_CHUNK_SIZE: usize = 128;
const DEFAULT_MAX_CHUNK_SIZE: usize = 2048;
const DEFAULT_CHUNK_SIZE: usize = 512;
const DEFAULT_CHUNK_OVERLAP: usize = 50;

const DEFAULT_TOP_K: usize = 5;
const DEFAULT_MAX_TOP_K: usize = 50;
const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 100;
const DEFAULT_MAX_QUEUE: usize = 100;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 7200;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_CHECKPOINT_INTERVAL: usize = 50;

const DEFAULT_GRAPH_TRAVERSAL_DEPTH: u32 = 2;
const DEFAULT_GRAPH_RRF_K: u32 = 60;
const DEFAULT_GRAPH_MAX_TRIPLETS_PER_CHUNK: usize = 10;

const DEFAULT_TELEMETRY_ENVIRONMENT: &str = "development";

/// Root configuration for the whole application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub embedding: EmbeddingConfig,
    pub summarization: SummarizationConfig,
    pub reranker: RerankerConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub graph: GraphConfig,
    pub telemetry: TelemetryConfig,
    /// Abort startup on any `Severity::Critical` validation failure instead
    /// of logging a warning and continuing.
    pub strict_mode: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            summarization: SummarizationConfig::default(),
            reranker: RerankerConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            graph: GraphConfig::default(),
            telemetry: TelemetryConfig::default(),
            strict_mode: false,
        }
    }
}

impl ApplicationConfig {
    /// Load configuration: discover a YAML file (or use defaults if none is
    /// found), then apply environment variable overrides.
    ///
    /// # Errors
    /// Returns an error if a discovered file exists but fails to parse, or
    /// if strict mode is on and validation finds a critical problem.
    pub fn load(state_dir: Option<&Path>) -> ConfigResult<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf());
        let mut config = match discovery::discover_config_path(state_dir, &cwd) {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)?;
                serde_yaml::from_str(&contents)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();

        if config.strict_mode {
            for warning in config.validate_all() {
                if warning.0 == Severity::Critical {
                    return Err(ConfigError::Generic {
                        message: warning.1,
                    });
                }
            }
        }

        Ok(config)
    }

    /// Apply the environment-variable overrides named in spec §6:
    /// state-directory override, config path override (handled in
    /// discovery), storage-backend override, database URL, provider API
    /// keys (handled lazily via `api_key_env` at read time).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("AGENT_BRAIN_STORAGE_BACKEND")
            && !backend.is_empty()
            && let Ok(parsed) = backend.parse::<StorageBackend>()
        {
            self.storage.backend = parsed;
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.storage.postgres.database_url = Some(url);
        }
    }

    /// Run every section's validator, collecting `(severity, message)` pairs
    /// instead of stopping at the first failure - used to populate
    /// `/health` warnings even outside strict mode.
    #[must_use]
    pub fn validate_all(&self) -> Vec<(Severity, String)> {
        let mut problems = Vec::new();
        for (result, label) in [
            (self.embedding.validate(), "embedding"),
            (self.summarization.validate(), "summarization"),
            (self.reranker.validate(), "reranker"),
            (self.storage.validate(), "storage"),
            (self.server.validate(), "server"),
        ] {
            if let Err(e) = result {
                let severity = classify_severity(&e);
                problems.push((severity, format!("{label}: {e}")));
            }
        }
        problems
    }
}

/// Missing-required-value and unknown-name errors are critical; everything
/// else (out-of-range values we can clamp, cosmetic URL issues) is a
/// warning.
fn classify_severity(error: &ConfigError) -> Severity {
    match error {
        ConfigError::MissingApiKey(_) | ConfigError::UnknownProvider { .. } => Severity::Critical,
        _ => Severity::Warning,
    }
}

// =============================================================================
// Embedding
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProviderKind {
    Openai,
    Ollama,
    Cohere,
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::Openai),
            "ollama" => Ok(Self::Ollama),
            "cohere" => Ok(Self::Cohere),
            other => Err(ConfigError::UnknownProvider {
                kind: "embedding",
                provider: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub params: serde_json::Value,
    pub dimensions: usize,
}

impl Default for EmbeddingProviderKind {
    fn default() -> Self {
        Self::Openai
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: DEFAULT_EMBEDDING_PROVIDER_MODEL.to_string(),
            api_key_env: DEFAULT_EMBEDDING_API_KEY_ENV.to_string(),
            base_url: None,
            params: serde_json::Value::Null,
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Validate for EmbeddingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.model, "embedding.model")?;
        if self.provider != EmbeddingProviderKind::Ollama
            && std::env::var(&self.api_key_env).is_err()
        {
            return Err(ConfigError::MissingApiKey(self.api_key_env.clone()));
        }
        Ok(())
    }
}

// =============================================================================
// Summarization
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummarizationProviderKind {
    Anthropic,
    Openai,
    Gemini,
    Grok,
    Ollama,
}

impl Default for SummarizationProviderKind {
    fn default() -> Self {
        Self::Anthropic
    }
}

impl std::str::FromStr for SummarizationProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::Openai),
            "gemini" => Ok(Self::Gemini),
            "grok" => Ok(Self::Grok),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::UnknownProvider {
                kind: "summarization",
                provider: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    pub provider: SummarizationProviderKind,
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub params: serde_json::Value,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            provider: SummarizationProviderKind::default(),
            model: DEFAULT_SUMMARIZATION_MODEL.to_string(),
            api_key_env: DEFAULT_SUMMARIZATION_API_KEY_ENV.to_string(),
            base_url: None,
            params: serde_json::Value::Null,
        }
    }
}

impl Validate for SummarizationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.model, "summarization.model")?;
        // Summarization is optional functionality; a missing key is a warning,
        // surfaced through Generic rather than MissingApiKey (not critical).
        if self.provider != SummarizationProviderKind::Ollama
            && std::env::var(&self.api_key_env).is_err()
        {
            return Err(ConfigError::Generic {
                message: format!(
                    "summarization API key env var '{}' is not set",
                    self.api_key_env
                ),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Reranker
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RerankerProviderKind {
    SentenceTransformers,
    Ollama,
}

impl Default for RerankerProviderKind {
    fn default() -> Self {
        Self::SentenceTransformers
    }
}

impl std::str::FromStr for RerankerProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sentence-transformers" => Ok(Self::SentenceTransformers),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::UnknownProvider {
                kind: "reranker",
                provider: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    pub enabled: bool,
    pub provider: RerankerProviderKind,
    pub model: String,
    pub params: serde_json::Value,
    pub top_k_multiplier: usize,
    pub max_candidates: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: RerankerProviderKind::default(),
            model: DEFAULT_RERANKER_MODEL.to_string(),
            params: serde_json::Value::Null,
            top_k_multiplier: DEFAULT_RERANKER_TOP_K_MULTIPLIER,
            max_candidates: DEFAULT_RERANKER_MAX_CANDIDATES,
        }
    }
}

impl Validate for RerankerConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.enabled {
            validation::validate_non_empty(&self.model, "reranker.model")?;
        }
        Ok(())
    }
}

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Chroma,
    Postgres,
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Chroma
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chroma" | "local" => Ok(Self::Chroma),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(ConfigError::UnknownProvider {
                kind: "storage.backend",
                provider: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub collection_name: String,
    pub local_state_subdir: String,
    pub postgres: PostgresConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            local_state_subdir: "chroma_db".to_string(),
            postgres: PostgresConfig::default(),
        }
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.collection_name, "storage.collection_name")?;
        if self.backend == StorageBackend::Postgres {
            self.postgres.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_size: u32,
    pub pool_max_overflow: u32,
    pub language: String,
    pub hnsw_m: u32,
    pub hnsw_ef_construction: u32,
    /// Full connection URL override (from `DATABASE_URL`); when set this
    /// wins over the discrete host/port/database/user/password fields.
    pub database_url: Option<String>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            database: DEFAULT_DB_NAME.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: String::new(),
            pool_size: DEFAULT_DB_POOL_SIZE,
            pool_max_overflow: DEFAULT_DB_POOL_MAX_OVERFLOW,
            language: DEFAULT_DB_LANGUAGE.to_string(),
            hnsw_m: DEFAULT_HNSW_M,
            hnsw_ef_construction: DEFAULT_HNSW_EF_CONSTRUCTION,
            database_url: None,
        }
    }
}

impl PostgresConfig {
    /// Build a `postgres://` connection string from the discrete fields,
    /// unless `database_url` overrides it.
    #[must_use]
    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }

    /// Connection string with the password redacted, safe to log.
    #[must_use]
    pub fn safe_connection_string(&self) -> String {
        format!(
            "postgres://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl Validate for PostgresConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_port(self.port)?;
        validation::validate_non_empty(&self.database, "storage.postgres.database")?;
        Ok(())
    }
}

// =============================================================================
// Server / limits
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_host: String,
    pub bind_port: u16,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub default_chunk_size: usize,
    pub default_chunk_overlap: usize,
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub default_similarity_threshold: f32,
    pub embedding_batch_size: usize,
    pub max_queue: usize,
    pub job_timeout_secs: u64,
    pub max_retries: u32,
    pub checkpoint_interval: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_API_HOST.to_string(),
            bind_port: DEFAULT_API_PORT,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            default_chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            default_top_k: DEFAULT_TOP_K,
            max_top_k: DEFAULT_MAX_TOP_K,
            default_similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            max_queue: DEFAULT_MAX_QUEUE,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Clamp a requested chunk size into `[min_chunk_size, max_chunk_size]`.
    #[must_use]
    pub fn clamp_chunk_size(&self, requested: usize) -> usize {
        requested.clamp(self.min_chunk_size, self.max_chunk_size)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_port(self.bind_port)?;
        if self.min_chunk_size > self.max_chunk_size {
            return Err(ConfigError::Generic {
                message: "server.min_chunk_size must be <= max_chunk_size".to_string(),
            });
        }
        validation::validate_range(self.max_top_k as u64, 1, 1000, "server.max_top_k")?;
        Ok(())
    }
}

// =============================================================================
// Graph
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphStoreType {
    /// In-memory arena, discarded on restart; never reads or writes
    /// `graph_index/` on disk.
    Simple,
    /// In-memory arena backed by a JSON snapshot under `graph_index/`,
    /// loaded at startup and flushed after every indexing job.
    Persisted,
}

impl Default for GraphStoreType {
    fn default() -> Self {
        Self::Persisted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Master switch; when false, `graph`/`multi` query modes return 400.
    pub enabled: bool,
    pub store_type: GraphStoreType,
    pub index_subdir: String,
    pub max_triplets_per_chunk: usize,
    pub use_code_metadata: bool,
    pub use_llm_extraction: bool,
    pub traversal_depth: u32,
    pub rrf_k: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            store_type: GraphStoreType::default(),
            index_subdir: "graph_index".to_string(),
            max_triplets_per_chunk: DEFAULT_GRAPH_MAX_TRIPLETS_PER_CHUNK,
            use_code_metadata: true,
            use_llm_extraction: true,
            traversal_depth: DEFAULT_GRAPH_TRAVERSAL_DEPTH,
            rrf_k: DEFAULT_GRAPH_RRF_K,
        }
    }
}

// =============================================================================
// Telemetry
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub level: String,
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
            environment: DEFAULT_TELEMETRY_ENVIRONMENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = ApplicationConfig::default();
        assert!(config.server.min_chunk_size <= config.server.max_chunk_size);
        assert!(config.server.default_top_k <= config.server.max_top_k);
    }

    #[test]
    fn clamp_chunk_size_respects_bounds() {
        let config = ApplicationConfig::default();
        assert_eq!(config.server.clamp_chunk_size(10), config.server.min_chunk_size);
        assert_eq!(config.server.clamp_chunk_size(100_000), config.server.max_chunk_size);
        assert_eq!(config.server.clamp_chunk_size(512), 512);
    }

    #[test]
    fn storage_backend_parses_case_insensitively() {
        assert_eq!("Postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!("chroma".parse::<StorageBackend>().unwrap(), StorageBackend::Chroma);
        assert!("unknown".parse::<StorageBackend>().is_err());
    }
}
