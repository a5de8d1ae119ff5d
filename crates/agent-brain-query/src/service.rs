//! Query service: readiness, mode dispatch, fusion, optional reranking.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use tokio::sync::Mutex;

use agent_brain_config::{GraphConfig, RerankerConfig, ServerConfig};
use agent_brain_graph::GraphIndex;
use agent_brain_providers::{EmbeddingProvider, RerankerProvider};
use agent_brain_storage::{MetadataFilter, SearchResult, StorageBackend};

use crate::error::{QueryError, QueryResult};
use crate::models::{CountResponse, QueryFilter, QueryMode, QueryRequest, QueryResponse, ScoredResult};

const QUERY_CACHE_CAPACITY: usize = 128;
const MAX_QUERY_LEN: usize = 4096;

pub struct QueryService {
    storage: Arc<dyn StorageBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn RerankerProvider>>,
    graph: Option<Arc<dyn GraphIndex>>,
    server_config: ServerConfig,
    reranker_config: RerankerConfig,
    graph_config: GraphConfig,
    cache: Mutex<LruCache<String, QueryResponse>>,
}

impl QueryService {
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Option<Arc<dyn RerankerProvider>>,
        graph: Option<Arc<dyn GraphIndex>>,
        server_config: ServerConfig,
        reranker_config: RerankerConfig,
        graph_config: GraphConfig,
    ) -> Self {
        Self {
            storage,
            embedder,
            reranker,
            graph,
            server_config,
            reranker_config,
            graph_config,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(QUERY_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// The service is ready iff the backend has recorded embedding
    /// provenance - a collection with no provenance has never had a
    /// successful upsert, so there's nothing to search yet.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub async fn is_ready(&self) -> QueryResult<bool> {
        Ok(self.storage.get_embedding_metadata().await?.is_some())
    }

    /// Total indexed chunk count, and whether the service is ready to
    /// serve queries (the `/query/count` contract).
    ///
    /// # Errors
    /// Propagates storage errors.
    pub async fn count(&self) -> QueryResult<CountResponse> {
        let total_chunks = self.storage.get_count(None).await?;
        let ready = self.is_ready().await?;
        Ok(CountResponse { total_chunks, ready })
    }

    /// Execute a query end to end: validate, check readiness and
    /// provenance compatibility, dispatch by mode, optionally rerank,
    /// and record latency.
    ///
    /// # Errors
    /// `QueryError::EmptyQuery`/`InvalidTopK`/`InvalidAlpha` on bad input;
    /// `QueryError::NotReady` if the service hasn't indexed anything yet;
    /// `QueryError::DimensionMismatch` if the collection's provenance
    /// disagrees with the currently configured embedder.
    pub async fn query(&self, request: QueryRequest) -> QueryResult<QueryResponse> {
        let started = Instant::now();
        self.validate(&request)?;
        self.check_readiness_and_provenance(&request).await?;

        let mode = request.mode.unwrap_or_default();
        let top_k = request
            .top_k
            .unwrap_or(self.server_config.default_top_k)
            .clamp(1, self.server_config.max_top_k);
        let min_score = request
            .min_score
            .unwrap_or(self.server_config.default_similarity_threshold);
        let filter = to_metadata_filter(request.filter.as_ref());

        let cache_key = format!("{}\0{mode:?}\0{top_k}", request.query.trim());
        if filter.is_none() && !request.rerank.unwrap_or(false) {
            if let Some(cached) = self.cache.lock().await.get(&cache_key) {
                return Ok(cached.clone());
            }
        }

        let mut results = match mode {
            QueryMode::Vector => self.run_vector(&request.query, top_k, min_score, filter.as_ref()).await?,
            QueryMode::Bm25 => self.run_bm25(&request.query, top_k, filter.as_ref()).await?,
            QueryMode::Hybrid => {
                self.run_hybrid(&request.query, top_k, min_score, request.alpha, filter.as_ref())
                    .await?
            }
            QueryMode::Graph => self.run_graph(&request.query, top_k).await?,
            QueryMode::Multi => {
                self.run_multi(&request.query, top_k, min_score, filter.as_ref())
                    .await?
            }
        };

        if request.rerank.unwrap_or(false) {
            if let Some(reranker) = &self.reranker {
                results = self.rerank(reranker.as_ref(), &request.query, results, top_k).await?;
            }
        }

        let response = QueryResponse {
            total_results: results.len(),
            results,
            mode,
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        if filter.is_none() && !request.rerank.unwrap_or(false) {
            self.cache.lock().await.put(cache_key, response.clone());
        }

        Ok(response)
    }

    fn validate(&self, request: &QueryRequest) -> QueryResult<()> {
        let trimmed = request.query.trim();
        if trimmed.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        if trimmed.len() > MAX_QUERY_LEN {
            return Err(QueryError::QueryTooLong { max: MAX_QUERY_LEN });
        }
        if let Some(top_k) = request.top_k {
            if top_k == 0 || top_k > self.server_config.max_top_k {
                return Err(QueryError::InvalidTopK {
                    max: self.server_config.max_top_k,
                });
            }
        }
        if let Some(alpha) = request.alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(QueryError::InvalidAlpha);
            }
        }
        if matches!(request.mode, Some(QueryMode::Graph) | Some(QueryMode::Multi)) && !self.graph_config.enabled {
            return Err(QueryError::GraphDisabled);
        }
        Ok(())
    }

    async fn check_readiness_and_provenance(&self, request: &QueryRequest) -> QueryResult<()> {
        let Some(stored) = self.storage.get_embedding_metadata().await? else {
            return Err(QueryError::NotReady {
                reason: "collection has not been indexed yet",
            });
        };
        if matches!(request.mode, Some(QueryMode::Vector) | Some(QueryMode::Hybrid) | Some(QueryMode::Multi) | None)
            && stored.dimensions != self.embedder.dimensions()
        {
            return Err(QueryError::DimensionMismatch {
                indexed: stored.dimensions,
                current: self.embedder.dimensions(),
            });
        }
        Ok(())
    }

    async fn run_vector(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> QueryResult<Vec<ScoredResult>> {
        let embedding = self.embedder.embed_query(query).await?;
        let results = self.storage.vector_search(&embedding, top_k, min_score, filter).await?;
        Ok(results.into_iter().map(ScoredResult::from).collect())
    }

    async fn run_bm25(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> QueryResult<Vec<ScoredResult>> {
        let results = self.storage.keyword_search(query, top_k, filter).await?;
        Ok(results.into_iter().map(ScoredResult::from).collect())
    }

    async fn run_hybrid(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
        alpha: Option<f32>,
        filter: Option<&MetadataFilter>,
    ) -> QueryResult<Vec<ScoredResult>> {
        let alpha = alpha.unwrap_or(0.5);
        let candidate_k = (top_k * self.reranker_config.top_k_multiplier).min(self.reranker_config.max_candidates);

        let embedding = self.embedder.embed_query(query).await?;
        let (vector_results, keyword_results) = tokio::try_join!(
            self.storage.vector_search(&embedding, candidate_k, min_score, filter),
            self.storage.keyword_search(query, candidate_k, filter),
        )?;

        let mut by_id: HashMap<String, ScoredResult> = HashMap::new();
        let mut vector_scores: HashMap<String, f32> = HashMap::new();
        let mut keyword_scores: HashMap<String, f32> = HashMap::new();

        for result in vector_results {
            vector_scores.insert(result.chunk_id.clone(), result.score);
            by_id.insert(result.chunk_id.clone(), ScoredResult::from(result));
        }
        for result in keyword_results {
            keyword_scores.insert(result.chunk_id.clone(), result.score);
            by_id.entry(result.chunk_id.clone()).or_insert_with(|| ScoredResult::from(result));
        }

        let mut fused: Vec<ScoredResult> = by_id
            .into_values()
            .map(|mut scored| {
                let v = vector_scores.get(&scored.chunk_id).copied().unwrap_or(0.0);
                let k = keyword_scores.get(&scored.chunk_id).copied().unwrap_or(0.0);
                scored.vector_score = vector_scores.get(&scored.chunk_id).copied();
                scored.bm25_score = keyword_scores.get(&scored.chunk_id).copied();
                scored.score = alpha * v + (1.0 - alpha) * k;
                scored
            })
            .collect();

        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(top_k);
        Ok(fused)
    }

    async fn run_graph(&self, query: &str, top_k: usize) -> QueryResult<Vec<ScoredResult>> {
        let Some(graph) = &self.graph else {
            return Err(QueryError::GraphDisabled);
        };
        let seeds = extract_seed_entities(query);
        let hits = graph.traverse(&seeds, self.graph_config.traversal_depth).await?;

        let mut results = Vec::new();
        for hit in hits.into_iter().take(top_k) {
            if let Some(record) = self.storage.get_by_id(&hit.chunk_id).await? {
                let mut scored = ScoredResult::from(record);
                scored.graph_score = Some(hit.score);
                scored.score = hit.score;
                results.push(scored);
            }
        }
        Ok(results)
    }

    async fn run_multi(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> QueryResult<Vec<ScoredResult>> {
        let candidate_k = (top_k * self.reranker_config.top_k_multiplier).min(self.reranker_config.max_candidates);
        let rrf_k = f64::from(self.graph_config.rrf_k);

        let embedding = self.embedder.embed_query(query).await?;
        let vector_future = self.storage.vector_search(&embedding, candidate_k, min_score, filter);
        let keyword_future = self.storage.keyword_search(query, candidate_k, filter);

        let (vector_results, keyword_results) = tokio::try_join!(vector_future, keyword_future)?;
        let graph_results: Vec<SearchResult> = if let Some(graph) = &self.graph {
            let seeds = extract_seed_entities(query);
            let hits = graph.traverse(&seeds, self.graph_config.traversal_depth).await?;
            let mut out = Vec::new();
            for hit in hits.into_iter().take(candidate_k) {
                if let Some(record) = self.storage.get_by_id(&hit.chunk_id).await? {
                    out.push(record);
                }
            }
            out
        } else {
            Vec::new()
        };

        let mut by_id: HashMap<String, ScoredResult> = HashMap::new();
        let mut rrf_scores: HashMap<String, f64> = HashMap::new();

        for (rank, result) in vector_results.into_iter().enumerate() {
            *rrf_scores.entry(result.chunk_id.clone()).or_default() += 1.0 / (rrf_k + rank as f64 + 1.0);
            let entry = by_id.entry(result.chunk_id.clone()).or_insert_with(|| ScoredResult::from(result.clone()));
            entry.vector_score = Some(result.score);
        }
        for (rank, result) in keyword_results.into_iter().enumerate() {
            *rrf_scores.entry(result.chunk_id.clone()).or_default() += 1.0 / (rrf_k + rank as f64 + 1.0);
            let entry = by_id.entry(result.chunk_id.clone()).or_insert_with(|| ScoredResult::from(result.clone()));
            entry.bm25_score = Some(result.score);
        }
        for (rank, result) in graph_results.into_iter().enumerate() {
            *rrf_scores.entry(result.chunk_id.clone()).or_default() += 1.0 / (rrf_k + rank as f64 + 1.0);
            let entry = by_id.entry(result.chunk_id.clone()).or_insert_with(|| ScoredResult::from(result.clone()));
            entry.graph_score = Some(1.0 / (rank as f32 + 1.0));
        }

        let mut fused: Vec<ScoredResult> = by_id
            .into_values()
            .map(|mut scored| {
                scored.score = rrf_scores.get(&scored.chunk_id).copied().unwrap_or(0.0) as f32;
                scored
            })
            .collect();
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(top_k);
        Ok(fused)
    }

    async fn rerank(
        &self,
        reranker: &dyn RerankerProvider,
        query: &str,
        mut results: Vec<ScoredResult>,
        top_k: usize,
    ) -> QueryResult<Vec<ScoredResult>> {
        if results.is_empty() {
            return Ok(results);
        }
        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        let scores = reranker.rerank(query, &texts).await?;
        for (result, score) in results.iter_mut().zip(scores) {
            result.rerank_score = Some(score);
            result.score = score;
        }
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        Ok(results)
    }
}

fn to_metadata_filter(filter: Option<&QueryFilter>) -> Option<MetadataFilter> {
    let filter = filter?;
    let metadata_filter = MetadataFilter {
        source_types: filter.source_types.clone(),
        languages: filter.languages.clone(),
    };
    if metadata_filter.is_empty() {
        None
    } else {
        Some(metadata_filter)
    }
}

/// Heuristic entity-seed extraction from a free-text query: every token of
/// at least three characters is tried as an entity id, since the arena
/// indexes entities by their literal source-level name.
fn extract_seed_entities(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != '_'))
        .filter(|token| token.len() >= 3)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_extraction_drops_short_tokens_and_punctuation() {
        let seeds = extract_seed_entities("how does `parse_config` work in main.rs?");
        assert!(seeds.contains(&"parse_config".to_string()));
        assert!(seeds.contains(&"main.rs".to_string()));
        assert!(!seeds.iter().any(|s| s == "in" || s == "is"));
    }

    #[test]
    fn metadata_filter_with_only_empty_fields_collapses_to_none() {
        let filter = QueryFilter {
            source_types: None,
            languages: None,
        };
        assert!(to_metadata_filter(Some(&filter)).is_none());
    }

    #[test]
    fn metadata_filter_with_languages_is_kept() {
        let filter = QueryFilter {
            source_types: None,
            languages: Some(vec!["rust".to_string()]),
        };
        assert!(to_metadata_filter(Some(&filter)).is_some());
    }
}
