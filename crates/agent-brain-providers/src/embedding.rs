//! Embedding provider trait and concrete HTTP-backed implementations
//!
//! The core never imports a concrete provider - it asks [`build_embedding_provider`]
//! for one by the tag recorded in [`agent_brain_config::EmbeddingProviderKind`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use agent_brain_config::{EmbeddingConfig, EmbeddingProviderKind};

use crate::error::{ProviderError, ProviderResult};

/// Generates dense vector embeddings for text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. The returned vector has one embedding per
    /// input, in the same order.
    async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>>;

    /// Embed a single query string - some providers use a distinct
    /// "query" instruction prefix from the one used for documents.
    async fn embed_query(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let mut batch = self.embed_batch(&[text]).await?;
        batch.pop().ok_or_else(|| ProviderError::Response {
            provider: self.name().to_string(),
            message: "embedding provider returned an empty batch".to_string(),
        })
    }

    /// Provider tag, e.g. `"openai"`.
    fn name(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;

    /// Dimensionality of vectors this provider produces.
    fn dimensions(&self) -> usize;
}

/// Build a concrete embedding provider from configuration.
///
/// # Errors
/// Returns `ProviderError::Authentication` if a required API key is unset.
pub fn build_embedding_provider(
    config: &EmbeddingConfig,
) -> ProviderResult<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderKind::Openai => Ok(Arc::new(OpenAiEmbeddingProvider::new(config)?)),
        EmbeddingProviderKind::Cohere => Ok(Arc::new(CohereEmbeddingProvider::new(config)?)),
        EmbeddingProviderKind::Ollama => Ok(Arc::new(OllamaEmbeddingProvider::new(config))),
    }
}

fn require_api_key(env_var: &str, provider: &str) -> ProviderResult<String> {
    std::env::var(env_var).map_err(|_| ProviderError::Authentication {
        provider: provider.to_string(),
        message: format!("environment variable '{env_var}' is not set"),
    })
}

// =============================================================================
// OpenAI
// =============================================================================

pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddingProvider {
    /// # Errors
    /// Returns an error if the configured API key environment variable is unset.
    pub fn new(config: &EmbeddingConfig) -> ProviderResult<Self> {
        let api_key = require_api_key(&config.api_key_env, "openai")?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingEntry>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingEntry {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        let request = OpenAiEmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "openai".to_string(),
                source,
            })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ProviderError::RateLimit {
                provider: "openai".to_string(),
                retry_after,
            });
        }

        let body: OpenAiEmbeddingResponse =
            response.json().await.map_err(|source| ProviderError::Request {
                provider: "openai".to_string(),
                source,
            })?;

        let mut entries = body.data;
        entries.sort_by_key(|e| e.index);
        Ok(entries.into_iter().map(|e| e.embedding).collect())
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// =============================================================================
// Cohere
// =============================================================================

pub struct CohereEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl CohereEmbeddingProvider {
    /// # Errors
    /// Returns an error if the configured API key environment variable is unset.
    pub fn new(config: &EmbeddingConfig) -> ProviderResult<Self> {
        let api_key = require_api_key(&config.api_key_env, "cohere")?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.cohere.com/v1".to_string()),
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[derive(Serialize)]
struct CohereEmbeddingRequest<'a> {
    model: &'a str,
    texts: &'a [&'a str],
    input_type: &'a str,
}

#[derive(Deserialize)]
struct CohereEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for CohereEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        let request = CohereEmbeddingRequest {
            model: &self.model,
            texts,
            input_type: "search_document",
        };
        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "cohere".to_string(),
                source,
            })?
            .json::<CohereEmbeddingResponse>()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "cohere".to_string(),
                source,
            })?;

        Ok(response.embeddings)
    }

    fn name(&self) -> &str {
        "cohere"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// =============================================================================
// Ollama (local, no API key)
// =============================================================================

pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    #[must_use]
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        let request = OllamaEmbedRequest {
            model: &self.model,
            input: texts,
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

        Ok(response.embeddings)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
