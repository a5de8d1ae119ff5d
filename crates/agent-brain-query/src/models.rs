//! Query request/response data model.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use agent_brain_storage::{DocumentMetadata, SearchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Vector,
    Bm25,
    Hybrid,
    Graph,
    Multi,
}

impl Default for QueryMode {
    fn default() -> Self {
        Self::Hybrid
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct QueryFilter {
    pub source_types: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub min_score: Option<f32>,
    #[serde(default)]
    pub mode: Option<QueryMode>,
    /// Hybrid fusion weight; `1.0` means vector-only, `0.0` means
    /// keyword-only. Ignored outside `hybrid` mode.
    #[serde(default)]
    pub alpha: Option<f32>,
    #[serde(default)]
    pub filter: Option<QueryFilter>,
    #[serde(default)]
    pub rerank: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScoredResult {
    pub chunk_id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    pub score: f32,
    pub vector_score: Option<f32>,
    pub bm25_score: Option<f32>,
    pub graph_score: Option<f32>,
    pub rerank_score: Option<f32>,
}

impl From<SearchResult> for ScoredResult {
    fn from(result: SearchResult) -> Self {
        Self {
            chunk_id: result.chunk_id,
            text: result.text,
            metadata: result.metadata,
            score: result.score,
            vector_score: result.vector_score,
            bm25_score: result.bm25_score,
            graph_score: None,
            rerank_score: result.rerank_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    pub results: Vec<ScoredResult>,
    pub total_results: usize,
    pub mode: QueryMode,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub total_chunks: u64,
    pub ready: bool,
}
