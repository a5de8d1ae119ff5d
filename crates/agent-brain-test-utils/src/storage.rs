//! In-memory [`StorageBackend`] double: no LMDB/tantivy/Postgres involved.
//! Vector search ranks by cosine similarity, keyword search by a simple
//! word-overlap count normalized the same way the real backends do.

use std::sync::Mutex;

use async_trait::async_trait;

use agent_brain_storage::{
    CompatibilityCheck, DocumentMetadata, EmbeddingMetadata, MetadataFilter,
    normalize_keyword_scores, SearchResult, StorageBackend, StorageError, StorageResult,
    UpsertBatch,
};

struct StoredDoc {
    id: String,
    embedding: Vec<f32>,
    text: String,
    metadata: DocumentMetadata,
}

#[derive(Default)]
struct State {
    docs: Vec<StoredDoc>,
    embedding_metadata: Option<EmbeddingMetadata>,
}

pub struct MockStorageBackend {
    state: Mutex<State>,
    fail_on_upsert: bool,
    fail_on_search: bool,
}

impl MockStorageBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fail_on_upsert: false,
            fail_on_search: false,
        }
    }

    #[must_use]
    pub fn with_upsert_failure(mut self) -> Self {
        self.fail_on_upsert = true;
        self
    }

    #[must_use]
    pub fn with_search_failure(mut self) -> Self {
        self.fail_on_search = true;
        self
    }

    /// Test-assertion helper: total documents currently stored.
    #[allow(clippy::missing_panics_doc)]
    pub fn stored_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).docs.len()
    }
}

impl Default for MockStorageBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

fn word_overlap(query: &str, text: &str) -> f32 {
    let query_words: Vec<&str> = query.split_whitespace().collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let text_lower = text.to_lowercase();
    query_words
        .iter()
        .filter(|w| text_lower.contains(&w.to_lowercase()))
        .count() as f32
}

#[async_trait]
impl StorageBackend for MockStorageBackend {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn upsert_documents(&self, batch: UpsertBatch<'_>) -> StorageResult<usize> {
        if self.fail_on_upsert {
            return Err(StorageError::Other("mock storage configured to fail on upsert".to_string()));
        }
        if !batch.has_equal_lengths() {
            return Err(StorageError::UnequalBatchLengths("upsert_documents"));
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for i in 0..batch.ids.len() {
            let doc = StoredDoc {
                id: batch.ids[i].clone(),
                embedding: batch.embeddings[i].clone(),
                text: batch.documents[i].clone(),
                metadata: batch.metadatas[i].clone(),
            };
            if let Some(existing) = state.docs.iter_mut().find(|d| d.id == doc.id) {
                *existing = doc;
            } else {
                state.docs.push(doc);
            }
        }
        Ok(batch.ids.len())
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> StorageResult<Vec<SearchResult>> {
        if self.fail_on_search {
            return Err(StorageError::Other("mock storage configured to fail on search".to_string()));
        }
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut scored: Vec<SearchResult> = state
            .docs
            .iter()
            .filter(|doc| filter.is_none_or(|f| f.matches(&doc.metadata)))
            .map(|doc| {
                let score = cosine_similarity(query_embedding, &doc.embedding);
                SearchResult {
                    chunk_id: doc.id.clone(),
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                    score,
                    vector_score: Some(score),
                    bm25_score: None,
                    rerank_score: None,
                }
            })
            .filter(|r| r.score >= min_score)
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StorageResult<Vec<SearchResult>> {
        if self.fail_on_search {
            return Err(StorageError::Other("mock storage configured to fail on search".to_string()));
        }
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let candidates: Vec<&StoredDoc> = state
            .docs
            .iter()
            .filter(|doc| filter.is_none_or(|f| f.matches(&doc.metadata)))
            .collect();
        let raw_scores: Vec<f32> = candidates
            .iter()
            .map(|doc| word_overlap(query, &doc.text))
            .collect();
        let normalized = normalize_keyword_scores(&raw_scores);
        let mut scored: Vec<SearchResult> = candidates
            .into_iter()
            .zip(normalized)
            .filter(|(_, score)| *score > 0.0)
            .map(|(doc, score)| SearchResult {
                chunk_id: doc.id.clone(),
                text: doc.text.clone(),
                metadata: doc.metadata.clone(),
                score,
                vector_score: None,
                bm25_score: Some(score),
                rerank_score: None,
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn get_count(&self, filter: Option<&MetadataFilter>) -> StorageResult<u64> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let count = state
            .docs
            .iter()
            .filter(|doc| filter.is_none_or(|f| f.matches(&doc.metadata)))
            .count();
        Ok(count as u64)
    }

    async fn get_by_id(&self, chunk_id: &str) -> StorageResult<Option<SearchResult>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.docs.iter().find(|doc| doc.id == chunk_id).map(|doc| SearchResult {
            chunk_id: doc.id.clone(),
            text: doc.text.clone(),
            metadata: doc.metadata.clone(),
            score: 1.0,
            vector_score: None,
            bm25_score: None,
            rerank_score: None,
        }))
    }

    async fn reset(&self) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.docs.clear();
        state.embedding_metadata = None;
        Ok(())
    }

    async fn get_embedding_metadata(&self) -> StorageResult<Option<EmbeddingMetadata>> {
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()).embedding_metadata.clone())
    }

    async fn set_embedding_metadata(&self, metadata: EmbeddingMetadata) -> StorageResult<()> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).embedding_metadata = Some(metadata);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch<'a>(
        ids: &'a [String],
        embeddings: &'a [Vec<f32>],
        documents: &'a [String],
        metadatas: &'a [DocumentMetadata],
    ) -> UpsertBatch<'a> {
        UpsertBatch { ids, embeddings, documents, metadatas }
    }

    #[tokio::test]
    async fn upsert_then_vector_search_ranks_by_similarity() {
        let storage = MockStorageBackend::new();
        let ids = vec!["a".to_string(), "b".to_string()];
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let documents = vec!["doc a".to_string(), "doc b".to_string()];
        let metadatas = vec![DocumentMetadata::default(), DocumentMetadata::default()];
        storage
            .upsert_documents(batch(&ids, &embeddings, &documents, &metadatas))
            .await
            .unwrap();

        let results = storage.vector_search(&[1.0, 0.0], 2, 0.0, None).await.unwrap();
        assert_eq!(results[0].chunk_id, "a");
    }

    #[tokio::test]
    async fn keyword_search_finds_overlapping_text() {
        let storage = MockStorageBackend::new();
        let ids = vec!["a".to_string()];
        let embeddings = vec![vec![0.0]];
        let documents = vec!["parse the config file".to_string()];
        let metadatas = vec![DocumentMetadata::default()];
        storage
            .upsert_documents(batch(&ids, &embeddings, &documents, &metadatas))
            .await
            .unwrap();

        let results = storage.keyword_search("config file", 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn upsert_failure_flag_returns_error() {
        let storage = MockStorageBackend::new().with_upsert_failure();
        let ids = vec!["a".to_string()];
        let embeddings = vec![vec![0.0]];
        let documents = vec!["x".to_string()];
        let metadatas = vec![DocumentMetadata::default()];
        assert!(
            storage
                .upsert_documents(batch(&ids, &embeddings, &documents, &metadatas))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn embedding_metadata_round_trips_until_reset() {
        let storage = MockStorageBackend::new();
        assert!(storage.get_embedding_metadata().await.unwrap().is_none());
        let metadata = EmbeddingMetadata {
            provider: "mock".to_string(),
            model: "mock-embedding".to_string(),
            dimensions: 8,
        };
        storage.set_embedding_metadata(metadata.clone()).await.unwrap();
        assert_eq!(storage.get_embedding_metadata().await.unwrap(), Some(metadata));

        storage.reset().await.unwrap();
        assert!(storage.get_embedding_metadata().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn compatibility_check_flags_dimension_mismatch() {
        let storage = MockStorageBackend::new();
        storage
            .set_embedding_metadata(EmbeddingMetadata {
                provider: "mock".to_string(),
                model: "mock-embedding".to_string(),
                dimensions: 8,
            })
            .await
            .unwrap();
        let check = storage
            .validate_embedding_compatibility("mock", "mock-embedding", 16)
            .await
            .unwrap();
        assert!(matches!(check, CompatibilityCheck::DimensionMismatch { .. }));
    }
}
