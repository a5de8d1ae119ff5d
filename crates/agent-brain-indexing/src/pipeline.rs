//! Indexing pipeline: loader -> chunker -> embedder -> backend upsert.
//!
//! Run once per job by the worker. Owns no state of its own besides the
//! buffers it accumulates while streaming a folder; job bookkeeping
//! (status, progress, retries) lives in [`crate::store::JobStore`].

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use agent_brain_chunking::{chunk_text, load_documents, Chunk, ChunkingOptions, LoaderOptions};
use agent_brain_config::GraphConfig;
use agent_brain_graph::GraphIndex;
use agent_brain_providers::{EmbeddingProvider, SummarizationProvider};
use agent_brain_storage::{DocumentMetadata, StorageBackend, UpsertBatch};

use crate::error::{IndexingError, IndexingResult};
use crate::models::IndexRequest;

/// Stable chunk identifier: `content_hash` alone collides whenever two
/// distinct chunks (different source, same text - license headers,
/// boilerplate) hash to the same value, silently dropping one on upsert.
/// Qualifying by source path and offsets keeps the id unique per chunk
/// while staying stable across re-indexes of the same file.
fn chunk_id(chunk: &Chunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.source_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(chunk.start_offset.to_le_bytes());
    hasher.update(chunk.end_offset.to_le_bytes());
    hasher.update(b"\0");
    hasher.update(chunk.content_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Polled between files and at every checkpoint; `true` means stop.
pub trait CancellationProbe: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// Reported back to the worker after every checkpoint so it can persist
/// `JobProgress`.
pub struct PipelineCheckpoint {
    pub files_processed: usize,
    pub files_total: usize,
    pub chunks_created: usize,
    pub current_file: Option<String>,
}

pub struct PipelineOutcome {
    pub files_processed: usize,
    pub chunks_created: usize,
    pub cancelled: bool,
}

pub struct Pipeline {
    storage: Arc<dyn StorageBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    checkpoint_interval: usize,
    embedding_batch_size: usize,
    graph: Option<Arc<dyn GraphIndex>>,
    graph_config: GraphConfig,
    summarizer: Option<Arc<dyn SummarizationProvider>>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
        checkpoint_interval: usize,
        embedding_batch_size: usize,
    ) -> Self {
        Self {
            storage,
            embedder,
            checkpoint_interval,
            embedding_batch_size,
            graph: None,
            graph_config: GraphConfig::default(),
            summarizer: None,
        }
    }

    /// Enable graph-index population during indexing. `summarizer` is used
    /// for the LLM-based triplet extractor when
    /// `graph_config.use_llm_extraction` is set; omit it to run rule-based
    /// extraction only.
    #[must_use]
    pub fn with_graph(
        mut self,
        graph: Arc<dyn GraphIndex>,
        graph_config: GraphConfig,
        summarizer: Option<Arc<dyn SummarizationProvider>>,
    ) -> Self {
        self.graph = Some(graph);
        self.graph_config = graph_config;
        self.summarizer = summarizer;
        self
    }

    /// Run the full pipeline for one job.
    ///
    /// # Errors
    /// `IndexingError::DimensionMismatch` if the collection's recorded
    /// provenance disagrees with the current embedder's dimensionality;
    /// `IndexingError::InvalidFolder` if the folder can't be walked;
    /// `IndexingError::NoDelta` if nothing changed; provider/storage
    /// errors otherwise.
    pub async fn run(
        &self,
        request: &IndexRequest,
        cancel: &dyn CancellationProbe,
        mut on_checkpoint: impl FnMut(PipelineCheckpoint) + Send,
    ) -> IndexingResult<PipelineOutcome> {
        self.check_provenance().await?;

        let count_before = self.storage.get_count(None).await?;

        let folder = Path::new(&request.folder_path);
        if !folder.exists() {
            return Err(IndexingError::InvalidFolder(request.folder_path.clone()));
        }

        let loader_options = LoaderOptions {
            recursive: request.recursive.unwrap_or(true),
            include_code: request.include_code.unwrap_or(true),
            include_docs: true,
            extra_ignores: Vec::new(),
        };
        let documents = load_documents(folder, &loader_options)?;
        let files_total = documents.len();

        let chunking_options = ChunkingOptions::clamped(
            request.chunk_size.unwrap_or(512),
            request.chunk_overlap.unwrap_or(50),
        );

        let mut pending: Vec<Chunk> = Vec::new();
        let mut files_processed = 0usize;
        let mut chunks_created = 0usize;
        let mut cancelled = false;

        for document in documents {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let path_str = document.path.to_string_lossy().to_string();
            let text = String::from_utf8_lossy(&document.bytes).into_owned();
            let chunks = chunk_text(
                &path_str,
                document.language.as_ref(),
                document.source_type,
                &text,
                chunking_options,
            );
            chunks_created += chunks.len();
            pending.extend(chunks);
            files_processed += 1;

            if pending.len() >= self.embedding_batch_size {
                self.flush(&mut pending).await?;
            }

            if files_processed % self.checkpoint_interval == 0 {
                self.flush(&mut pending).await?;
                on_checkpoint(PipelineCheckpoint {
                    files_processed,
                    files_total,
                    chunks_created,
                    current_file: Some(path_str),
                });
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
            }
        }

        if !cancelled {
            self.flush(&mut pending).await?;
        }

        on_checkpoint(PipelineCheckpoint {
            files_processed,
            files_total,
            chunks_created,
            current_file: None,
        });

        if cancelled {
            return Ok(PipelineOutcome {
                files_processed,
                chunks_created,
                cancelled: true,
            });
        }

        if self.storage.get_embedding_metadata().await?.is_none() {
            self.storage
                .set_embedding_metadata(agent_brain_storage::EmbeddingMetadata {
                    provider: self.embedder.name().to_string(),
                    model: self.embedder.model().to_string(),
                    dimensions: self.embedder.dimensions(),
                })
                .await?;
        }

        let count_after = self.storage.get_count(None).await?;
        if count_after <= count_before && files_processed == 0 {
            return Err(IndexingError::NoDelta);
        }

        if let Some(graph) = &self.graph {
            graph.persist().await?;
        }

        Ok(PipelineOutcome {
            files_processed,
            chunks_created,
            cancelled: false,
        })
    }

    async fn check_provenance(&self) -> IndexingResult<()> {
        use agent_brain_storage::CompatibilityCheck;

        let check = self
            .storage
            .validate_embedding_compatibility(
                self.embedder.name(),
                self.embedder.model(),
                self.embedder.dimensions(),
            )
            .await?;

        match check {
            CompatibilityCheck::Unset | CompatibilityCheck::Compatible => Ok(()),
            CompatibilityCheck::ProviderMismatch { stored } => {
                tracing::warn!(
                    stored.provider = %stored.provider,
                    stored.model = %stored.model,
                    current.provider = %self.embedder.name(),
                    current.model = %self.embedder.model(),
                    "embedding provider/model changed since the collection was indexed"
                );
                Ok(())
            }
            CompatibilityCheck::DimensionMismatch { stored } => {
                Err(IndexingError::DimensionMismatch {
                    indexed: stored.dimensions,
                    current: self.embedder.dimensions(),
                })
            }
        }
    }

    async fn flush(&self, pending: &mut Vec<Chunk>) -> IndexingResult<()> {
        if pending.is_empty() {
            return Ok(());
        }

        for batch in pending.chunks(self.embedding_batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            let ids: Vec<String> = batch.iter().map(chunk_id).collect();
            let documents: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let metadatas: Vec<DocumentMetadata> = batch
                .iter()
                .map(|c| DocumentMetadata {
                    source_path: c.source_path.clone(),
                    language: c.language.clone(),
                    title: None,
                    summary: None,
                    source_type: Some(c.source_type.to_string()),
                    extra: serde_json::json!({
                        "start_offset": c.start_offset,
                        "end_offset": c.end_offset,
                    }),
                })
                .collect();

            self.storage
                .upsert_documents(UpsertBatch {
                    ids: &ids,
                    embeddings: &embeddings,
                    documents: &documents,
                    metadatas: &metadatas,
                })
                .await?;

            if let Some(graph) = &self.graph {
                for (chunk, chunk_id) in batch.iter().zip(&ids) {
                    let edges = agent_brain_graph::extract_edges_for_chunk(
                        &self.graph_config,
                        self.summarizer.as_ref(),
                        &chunk.source_path,
                        chunk.language.as_deref(),
                        &chunk.text,
                        chunk_id,
                    )
                    .await?;
                    if !edges.is_empty() {
                        graph.insert_edges(edges).await?;
                    }
                }
            }
        }

        pending.clear();
        Ok(())
    }
}
