//! Deterministic mock [`RerankerProvider`]: scores candidates by the
//! fraction of query words they contain, no model inference involved.

use async_trait::async_trait;
use std::collections::HashSet;

use agent_brain_providers::{ProviderResult, RerankerProvider};

pub struct MockRerankerProvider {
    name: String,
    model: String,
}

impl MockRerankerProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            model: "mock-reranker".to_string(),
        }
    }
}

impl Default for MockRerankerProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RerankerProvider for MockRerankerProvider {
    async fn rerank(&self, query: &str, candidates: &[&str]) -> ProviderResult<Vec<f32>> {
        let query_words: HashSet<&str> = query.split_whitespace().collect();
        Ok(candidates
            .iter()
            .map(|candidate| {
                let candidate_words: HashSet<&str> = candidate.split_whitespace().collect();
                let overlap = query_words.intersection(&candidate_words).count();
                if query_words.is_empty() {
                    0.0
                } else {
                    overlap as f32 / query_words.len() as f32
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scores_by_word_overlap() {
        let reranker = MockRerankerProvider::new();
        let scores = reranker
            .rerank("parse config file", &["parse the config", "unrelated text"])
            .await
            .unwrap();
        assert!(scores[0] > scores[1]);
    }
}
