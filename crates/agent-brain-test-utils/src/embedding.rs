//! Deterministic mock [`EmbeddingProvider`]: same text always yields the
//! same vector, without any network call.

use async_trait::async_trait;

use agent_brain_providers::{EmbeddingProvider, ProviderError, ProviderResult};

pub struct MockEmbeddingProvider {
    dimensions: usize,
    name: String,
    model: String,
    fail: bool,
}

impl MockEmbeddingProvider {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            name: "mock".to_string(),
            model: "mock-embedding".to_string(),
            fail: false,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, name: &str, model: &str) -> Self {
        self.name = name.to_string();
        self.model = model.to_string();
        self
    }

    #[must_use]
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Hash-based pseudo-embedding: deterministic per input text, bounded
    /// to `[-1, 1]` per component so cosine similarity behaves sanely.
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % self.dimensions;
            vector[slot] += f32::from(byte) / 255.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        if self.fail {
            return Err(ProviderError::Response {
                provider: self.name.clone(),
                message: "mock embedding provider configured to fail".to_string(),
            });
        }
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_yields_same_vector() {
        let provider = MockEmbeddingProvider::new(8);
        let a = provider.embed_query("hello world").await.unwrap();
        let b = provider.embed_query("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_text_yields_different_vector() {
        let provider = MockEmbeddingProvider::new(8);
        let a = provider.embed_query("hello").await.unwrap();
        let b = provider.embed_query("goodbye").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn failure_mode_returns_error() {
        let provider = MockEmbeddingProvider::new(8).with_failure();
        assert!(provider.embed_query("hello").await.is_err());
    }
}
