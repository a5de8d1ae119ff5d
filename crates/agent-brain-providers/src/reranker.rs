//! Cross-encoder reranker trait and concrete HTTP-backed implementations
//!
//! Rerankers score a `(query, candidate)` pair directly rather than
//! comparing independent embeddings, so they run over a small shortlist
//! (`top_k * top_k_multiplier`, capped at `max_candidates`) after the
//! initial retrieval pass, not the whole collection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use agent_brain_config::{RerankerConfig, RerankerProviderKind};

use crate::error::{ProviderError, ProviderResult};

#[async_trait]
pub trait RerankerProvider: Send + Sync {
    /// Score each candidate against `query`. Returns one score per
    /// candidate, in the same order, higher is more relevant. Scores are
    /// not guaranteed to be normalized to `[0, 1]` by the provider; callers
    /// normalize before fusing with other signals.
    async fn rerank(&self, query: &str, candidates: &[&str]) -> ProviderResult<Vec<f32>>;

    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

/// Build a concrete reranker provider from configuration. Returns `None`
/// when reranking is disabled.
///
/// # Errors
/// Returns `ProviderError::Authentication` if a required API key is unset.
pub fn build_reranker_provider(
    config: &RerankerConfig,
) -> ProviderResult<Option<Arc<dyn RerankerProvider>>> {
    if !config.enabled {
        return Ok(None);
    }
    let provider: Arc<dyn RerankerProvider> = match config.provider {
        RerankerProviderKind::SentenceTransformers => {
            Arc::new(SentenceTransformersReranker::new(config))
        }
        RerankerProviderKind::Ollama => Arc::new(OllamaReranker::new(config)),
    };
    Ok(Some(provider))
}

// =============================================================================
// sentence-transformers (served behind a local cross-encoder HTTP sidecar)
// =============================================================================

pub struct SentenceTransformersReranker {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl SentenceTransformersReranker {
    #[must_use]
    pub fn new(config: &RerankerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://localhost:8008".to_string(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [&'a str],
}

#[derive(Deserialize)]
struct RerankScore {
    score: f32,
    index: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankScore>,
}

#[async_trait]
impl RerankerProvider for SentenceTransformersReranker {
    async fn rerank(&self, query: &str, candidates: &[&str]) -> ProviderResult<Vec<f32>> {
        let request = RerankRequest {
            model: &self.model,
            query,
            documents: candidates,
        };
        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "sentence-transformers".to_string(),
                source,
            })?
            .json::<RerankResponse>()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "sentence-transformers".to_string(),
                source,
            })?;

        let mut scores = vec![0.0_f32; candidates.len()];
        for entry in response.results {
            if let Some(slot) = scores.get_mut(entry.index) {
                *slot = entry.score;
            }
        }
        Ok(scores)
    }

    fn name(&self) -> &str {
        "sentence-transformers"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Ollama (scores via repeated single-document prompts, since Ollama has no
// native batched cross-encoder endpoint)
// =============================================================================

pub struct OllamaReranker {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaReranker {
    #[must_use]
    pub fn new(config: &RerankerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://localhost:11434".to_string(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl RerankerProvider for OllamaReranker {
    async fn rerank(&self, query: &str, candidates: &[&str]) -> ProviderResult<Vec<f32>> {
        let query_vec = self.embed(query).await?;
        let mut scores = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let candidate_vec = self.embed(candidate).await?;
            scores.push(cosine_similarity(&query_vec, &candidate_vec));
        }
        Ok(scores)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl OllamaReranker {
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let request = OllamaEmbedRequest {
            model: &self.model,
            input: text,
        };
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|_source| ProviderError::OllamaConnection {
                base_url: self.base_url.clone(),
            })?
            .json::<OllamaEmbedResponse>()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "ollama".to_string(),
                source,
            })?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Response {
                provider: "ollama".to_string(),
                message: "empty embeddings list".to_string(),
            })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_handles_zero_vector() {
        let zero = vec![0.0, 0.0];
        let other = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&zero, &other), 0.0);
    }
}
