//! Deterministic mock [`SummarizationProvider`]. Also usable as the LLM
//! extractor in graph-index tests: configure `with_triplet_response` to
//! return a fixed `subject | relation | object` line.

use async_trait::async_trait;

use agent_brain_providers::{ProviderResult, SummarizationProvider};

pub struct MockSummarizationProvider {
    name: String,
    model: String,
    response: Option<String>,
}

impl MockSummarizationProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            model: "mock-summarizer".to_string(),
            response: None,
        }
    }

    #[must_use]
    pub fn with_fixed_response(mut self, response: &str) -> Self {
        self.response = Some(response.to_string());
        self
    }
}

impl Default for MockSummarizationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SummarizationProvider for MockSummarizationProvider {
    async fn summarize(&self, text: &str) -> ProviderResult<String> {
        if let Some(response) = &self.response {
            return Ok(response.clone());
        }
        let first_line = text.lines().next().unwrap_or_default();
        Ok(format!("summary: {first_line}"))
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
    async fn default_summary_echoes_first_line() {
        let provider = MockSummarizationProvider::new();
        let summary = provider.summarize("hello\nworld").await.unwrap();
        assert_eq!(summary, "summary: hello");
    }

    #[tokio::test]
    async fn fixed_response_overrides_echo() {
        let provider = MockSummarizationProvider::new().with_fixed_response("a | b | c");
        let summary = provider.summarize("anything").await.unwrap();
        assert_eq!(summary, "a | b | c");
    }
}
