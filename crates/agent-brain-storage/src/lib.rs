//! Storage backend abstraction: one async trait, two implementations.
//!
//! `local` is the embedded/zero-dependency default (heed+arroy for
//! vectors, tantivy for BM25). `postgres` is the relational backend
//! (pgvector + weighted tsvector) for deployments that already run
//! Postgres. Callers depend only on [`StorageBackend`].

mod error;
mod local;
mod model;
mod postgres;
mod traits;

pub use error::{StorageError, StorageResult};
pub use local::LocalStorageBackend;
pub use model::{DistanceMetric, DocumentMetadata, MetadataFilter, SearchResult, normalize_keyword_scores};
pub use postgres::PostgresStorageBackend;
pub use traits::{CompatibilityCheck, EmbeddingMetadata, PoolDiagnostics, StorageBackend, UpsertBatch};

use std::path::Path;
use std::sync::Arc;

use agent_brain_config::{StorageBackend as StorageBackendKind, StorageConfig};

/// Resolve the configured backend into a live `dyn StorageBackend`.
///
/// Mirrors the config-driven backend selection of the original service:
/// env var and YAML config both flow into [`StorageConfig::backend`]
/// before this is ever called.
///
/// # Errors
/// Returns an error if opening the local index or connecting to Postgres
/// (including running migrations) fails.
pub async fn build_storage_backend(
    config: &StorageConfig,
    state_dir: &Path,
) -> StorageResult<Arc<dyn StorageBackend>> {
    match config.backend {
        StorageBackendKind::Chroma => {
            let dir = state_dir.join("storage");
            let backend = LocalStorageBackend::open(&dir)?;
            Ok(Arc::new(backend))
        }
        StorageBackendKind::Postgres => {
            let pool = postgres::connect(&config.postgres).await?;
            let distance_metric = DistanceMetric::Cosine;
            let backend =
                PostgresStorageBackend::new(pool, config.postgres.language.clone(), distance_metric);
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_brain_config::ApplicationConfig;

    #[tokio::test]
    async fn local_backend_round_trips_upsert_and_search() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = LocalStorageBackend::open(dir.path()).expect("open local backend");
        backend.initialize().await.expect("initialize");

        backend
            .set_embedding_metadata(EmbeddingMetadata {
                provider: "openai".to_string(),
                model: "text-embedding-3-small".to_string(),
                dimensions: 3,
            })
            .await
            .expect("set embedding metadata");

        let ids = vec!["a".to_string()];
        let embeddings = vec![vec![1.0, 0.0, 0.0]];
        let documents = vec!["hello world".to_string()];
        let metadatas = vec![DocumentMetadata {
            source_path: "a.md".to_string(),
            title: Some("Hello".to_string()),
            ..Default::default()
        }];

        let inserted = backend
            .upsert_documents(UpsertBatch {
                ids: &ids,
                embeddings: &embeddings,
                documents: &documents,
                metadatas: &metadatas,
            })
            .await
            .expect("upsert");
        assert_eq!(inserted, 1);

        let hits = backend
            .vector_search(&[1.0, 0.0, 0.0], 5, 0.0, None)
            .await
            .expect("vector search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a");
        assert!(hits[0].score > 0.9);

        let keyword_hits = backend
            .keyword_search("hello", 5, None)
            .await
            .expect("keyword search");
        assert_eq!(keyword_hits.len(), 1);
        assert_eq!(keyword_hits[0].chunk_id, "a");
    }

    #[tokio::test]
    async fn local_backend_reports_dimension_mismatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = LocalStorageBackend::open(dir.path()).expect("open local backend");
        backend
            .set_embedding_metadata(EmbeddingMetadata {
                provider: "openai".to_string(),
                model: "text-embedding-3-small".to_string(),
                dimensions: 3,
            })
            .await
            .expect("set embedding metadata");

        let check = backend
            .validate_embedding_compatibility("openai", "text-embedding-3-small", 4)
            .await
            .expect("validate");
        assert!(matches!(check, CompatibilityCheck::DimensionMismatch { .. }));
    }

    #[test]
    fn default_storage_config_selects_local_backend() {
        let config = ApplicationConfig::default();
        assert_eq!(config.storage.backend, StorageBackendKind::Chroma);
    }
}
