//! Embedded/local storage backend: LMDB (heed) for document bodies and
//! provenance, arroy for vector kNN, tantivy for BM25. No external
//! services required; this is the zero-dependency default backend.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use heed::types::{SerdeJson, Str};
use heed::{Database, Env, EnvOpenOptions};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::local::keyword::KeywordIndex;
use crate::local::vectors::{RecordStore, VectorIndex};
use crate::model::{DistanceMetric, DocumentMetadata, MetadataFilter, SearchResult};
use crate::traits::{EmbeddingMetadata, StorageBackend, UpsertBatch};

const PROVENANCE_KEY: &str = "embedding_metadata";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    text: String,
    metadata: DocumentMetadata,
}

/// `LocalStorageBackend` assumes a single writer at a time (enforced by
/// the runtime lock on its state directory), but guards its own internal
/// writer handles with a mutex so concurrent `tokio` tasks within one
/// process can't race each other's LMDB/tantivy write transactions.
pub struct LocalStorageBackend {
    env: Env,
    documents: Database<Str, SerdeJson<StoredDocument>>,
    records: RecordStore,
    vectors: Mutex<Option<VectorIndex>>,
    keyword: KeywordIndex,
    dimensions: Mutex<Option<usize>>,
    root: PathBuf,
}

impl LocalStorageBackend {
    /// Open (creating if absent) a local collection rooted at `dir`.
    ///
    /// Vector dimensionality isn't known until the first upsert or until
    /// provenance has already been recorded on disk, so [`VectorIndex`]
    /// opening is deferred; see [`Self::vector_index`].
    pub fn open(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(1024 * 1024 * 1024)
                .max_dbs(10)
                .open(dir)?
        };
        let mut wtxn = env.write_txn()?;
        let documents: Database<Str, SerdeJson<StoredDocument>> =
            env.create_database(&mut wtxn, Some("documents"))?;
        wtxn.commit()?;

        let records = RecordStore::open(&env)?;
        let keyword = KeywordIndex::open(&dir.join("keyword"))?;

        let dimensions = records
            .get(PROVENANCE_KEY)?
            .and_then(|v| serde_json::from_value::<EmbeddingMetadata>(v).ok())
            .map(|m| m.dimensions);

        let vectors = match dimensions {
            Some(dims) => Some(VectorIndex::open(&dir.join("vectors"), dims)?),
            None => None,
        };

        Ok(Self {
            env,
            documents,
            records,
            vectors: Mutex::new(vectors),
            keyword,
            dimensions: Mutex::new(dimensions),
            root: dir.to_path_buf(),
        })
    }

    fn vector_index(&self, dims: usize) -> StorageResult<()> {
        let mut guard = self.vectors.lock().expect("vector index lock poisoned");
        if guard.is_none() {
            *guard = Some(VectorIndex::open(&self.root.join("vectors"), dims)?);
            *self.dimensions.lock().expect("dimensions lock poisoned") = Some(dims);
        }
        Ok(())
    }

    fn with_vectors<T>(&self, f: impl FnOnce(&VectorIndex) -> StorageResult<T>) -> StorageResult<T> {
        let guard = self.vectors.lock().expect("vector index lock poisoned");
        match guard.as_ref() {
            Some(index) => f(index),
            None => Err(StorageError::NotInitialized),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalStorageBackend {
    async fn initialize(&self) -> StorageResult<()> {
        // Database creation already happened in `open`; nothing further
        // needed, kept for symmetry with the Postgres backend's migrations.
        Ok(())
    }

    async fn upsert_documents(&self, batch: UpsertBatch<'_>) -> StorageResult<usize> {
        if !batch.has_equal_lengths() {
            return Err(StorageError::UnequalBatchLengths(
                "ids/embeddings/documents/metadatas",
            ));
        }
        if batch.ids.is_empty() {
            return Ok(0);
        }

        let dims = batch.embeddings[0].len();
        self.vector_index(dims)?;

        let mut wtxn = self.env.write_txn()?;
        let mut writer = self.keyword.writer()?;

        for (((id, embedding), text), metadata) in batch
            .ids
            .iter()
            .zip(batch.embeddings.iter())
            .zip(batch.documents.iter())
            .zip(batch.metadatas.iter())
        {
            self.documents.put(
                &mut wtxn,
                id,
                &StoredDocument {
                    text: text.clone(),
                    metadata: metadata.clone(),
                },
            )?;
            self.with_vectors(|index| index.upsert(id, embedding))?;
            self.keyword.upsert(
                &mut writer,
                id,
                metadata.title.as_deref(),
                metadata.summary.as_deref(),
                text,
                metadata.source_type.as_deref(),
                metadata.language.as_deref(),
            )?;
        }
        wtxn.commit()?;
        self.with_vectors(VectorIndex::build)?;
        self.keyword.commit(writer)?;

        Ok(batch.ids.len())
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> StorageResult<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let overfetch = if filter.map_or(true, MetadataFilter::is_empty) {
            top_k
        } else {
            (top_k * 5).max(50)
        };
        let hits = self.with_vectors(|index| index.search(query_embedding, overfetch))?;

        let rtxn = self.env.read_txn()?;
        let mut results = Vec::with_capacity(top_k);
        for (chunk_id, distance) in hits {
            let Some(stored) = self.documents.get(&rtxn, &chunk_id)? else {
                continue;
            };
            if let Some(filter) = filter {
                if !filter.matches(&stored.metadata) {
                    continue;
                }
            }
            let score = DistanceMetric::Cosine.normalize(distance);
            if score < min_score {
                continue;
            }
            results.push(SearchResult {
                chunk_id,
                text: stored.text,
                metadata: stored.metadata,
                score,
                vector_score: Some(score),
                bm25_score: None,
                rerank_score: None,
            });
            if results.len() >= top_k {
                break;
            }
        }
        Ok(results)
    }

    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StorageResult<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let hits = self.keyword.search(query, top_k, filter)?;
        let raw_scores: Vec<f32> = hits.iter().map(|(_, score)| *score).collect();
        let normalized = crate::model::normalize_keyword_scores(&raw_scores);

        let rtxn = self.env.read_txn()?;
        let mut results = Vec::with_capacity(hits.len());
        for ((chunk_id, _), score) in hits.into_iter().zip(normalized) {
            let Some(stored) = self.documents.get(&rtxn, &chunk_id)? else {
                continue;
            };
            results.push(SearchResult {
                chunk_id,
                text: stored.text,
                metadata: stored.metadata,
                score,
                vector_score: None,
                bm25_score: Some(score),
                rerank_score: None,
            });
        }
        Ok(results)
    }

    async fn get_count(&self, filter: Option<&MetadataFilter>) -> StorageResult<u64> {
        let rtxn = self.env.read_txn()?;
        let Some(filter) = filter else {
            return Ok(self.documents.len(&rtxn)?);
        };
        if filter.is_empty() {
            return Ok(self.documents.len(&rtxn)?);
        }
        let mut count = 0u64;
        for entry in self.documents.iter(&rtxn)? {
            let (_, stored) = entry?;
            if filter.matches(&stored.metadata) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn get_by_id(&self, chunk_id: &str) -> StorageResult<Option<SearchResult>> {
        let rtxn = self.env.read_txn()?;
        let Some(stored) = self.documents.get(&rtxn, chunk_id)? else {
            return Ok(None);
        };
        Ok(Some(SearchResult {
            chunk_id: chunk_id.to_string(),
            text: stored.text,
            metadata: stored.metadata,
            score: 1.0,
            vector_score: None,
            bm25_score: None,
            rerank_score: None,
        }))
    }

    async fn reset(&self) -> StorageResult<()> {
        let mut wtxn = self.env.write_txn()?;
        self.documents.clear(&mut wtxn)?;
        wtxn.commit()?;
        self.records.clear()?;
        if let Some(index) = self.vectors.lock().expect("vector index lock poisoned").as_ref() {
            index.clear()?;
        }
        self.keyword.clear()?;
        *self.dimensions.lock().expect("dimensions lock poisoned") = None;
        Ok(())
    }

    async fn get_embedding_metadata(&self) -> StorageResult<Option<EmbeddingMetadata>> {
        let Some(value) = self.records.get(PROVENANCE_KEY)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn set_embedding_metadata(&self, metadata: EmbeddingMetadata) -> StorageResult<()> {
        self.vector_index(metadata.dimensions)?;
        self.records
            .put(PROVENANCE_KEY, &serde_json::to_value(metadata)?)
    }
}
