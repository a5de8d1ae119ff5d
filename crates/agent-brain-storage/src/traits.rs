//! The storage backend contract every implementation (embedded/local,
//! Postgres) must satisfy. The rest of the system only ever depends on
//! `dyn StorageBackend`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::StorageResult;
use crate::model::{DocumentMetadata, MetadataFilter, SearchResult};

/// Recorded once per collection on the first successful upsert. Set-once
/// until [`StorageBackend::reset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

/// Connection-pool diagnostics, surfaced by `GET /health/{backend}`.
/// Only meaningful for pooled backends; the embedded local backend has
/// no pool and so never returns one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PoolDiagnostics {
    pub size: u32,
    pub idle: u32,
}

/// Outcome of [`StorageBackend::validate_embedding_compatibility`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityCheck {
    /// No provenance recorded yet - this will be the first write.
    Unset,
    Compatible,
    /// Provider/model differ but dimensions match: a warning, not a
    /// blocker.
    ProviderMismatch { stored: EmbeddingMetadata },
    /// Dimensions differ: critical, refuse to proceed.
    DimensionMismatch { stored: EmbeddingMetadata },
}

/// One batch of documents to upsert. The four arrays must have equal
/// length; the storage layer validates this itself rather than trusting
/// the caller.
pub struct UpsertBatch<'a> {
    pub ids: &'a [String],
    pub embeddings: &'a [Vec<f32>],
    pub documents: &'a [String],
    pub metadatas: &'a [DocumentMetadata],
}

impl UpsertBatch<'_> {
    #[must_use]
    pub fn has_equal_lengths(&self) -> bool {
        let n = self.ids.len();
        self.embeddings.len() == n && self.documents.len() == n && self.metadatas.len() == n
    }
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Create schema/collections. Idempotent.
    async fn initialize(&self) -> StorageResult<()>;

    /// Atomically upsert a batch of documents. Embeddings must match the
    /// collection's recorded dimensionality once one has been set.
    /// Returns the count inserted or updated.
    async fn upsert_documents(&self, batch: UpsertBatch<'_>) -> StorageResult<usize>;

    /// kNN search. Scores are normalised to `[0, 1]`, higher is better.
    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> StorageResult<Vec<SearchResult>>;

    /// Sparse keyword search. Scores are normalised per-query by max.
    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StorageResult<Vec<SearchResult>>;

    /// Count of stored documents, optionally restricted by `filter`.
    async fn get_count(&self, filter: Option<&MetadataFilter>) -> StorageResult<u64>;

    async fn get_by_id(&self, chunk_id: &str) -> StorageResult<Option<SearchResult>>;

    /// Wipe all data and provenance.
    async fn reset(&self) -> StorageResult<()>;

    async fn get_embedding_metadata(&self) -> StorageResult<Option<EmbeddingMetadata>>;

    /// Set-once until `reset`. Callers should only call this when
    /// [`Self::get_embedding_metadata`] previously returned `None`.
    async fn set_embedding_metadata(&self, metadata: EmbeddingMetadata) -> StorageResult<()>;

    /// Compare a live `(provider, model, dimensions)` triple against the
    /// collection's recorded provenance.
    async fn validate_embedding_compatibility(
        &self,
        provider: &str,
        model: &str,
        dimensions: usize,
    ) -> StorageResult<CompatibilityCheck> {
        let Some(stored) = self.get_embedding_metadata().await? else {
            return Ok(CompatibilityCheck::Unset);
        };
        if stored.dimensions != dimensions {
            return Ok(CompatibilityCheck::DimensionMismatch { stored });
        }
        if stored.provider != provider || stored.model != model {
            return Ok(CompatibilityCheck::ProviderMismatch { stored });
        }
        Ok(CompatibilityCheck::Compatible)
    }

    /// Connection-pool diagnostics, if this backend has a pool. The
    /// embedded local backend always returns `None`.
    fn pool_diagnostics(&self) -> Option<PoolDiagnostics> {
        None
    }
}
