//! Summarization provider trait and concrete HTTP-backed implementations
//!
//! Used by the indexing pipeline to generate a short chunk summary, which
//! feeds the title/summary fields of the keyword index's weighted tsvector.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use agent_brain_config::{SummarizationConfig, SummarizationProviderKind};

use crate::error::{ProviderError, ProviderResult};

const DEFAULT_PROMPT_TEMPLATE: &str =
    "Summarize the following content in one or two sentences, focusing on what it does:\n\n{text}";

#[async_trait]
pub trait SummarizationProvider: Send + Sync {
    /// Produce a short summary of `text`.
    async fn summarize(&self, text: &str) -> ProviderResult<String>;

    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

/// Build a concrete summarization provider from configuration.
///
/// # Errors
/// Returns `ProviderError::Authentication` if a required API key is unset.
pub fn build_summarization_provider(
    config: &SummarizationConfig,
) -> ProviderResult<Arc<dyn SummarizationProvider>> {
    match config.provider {
        SummarizationProviderKind::Anthropic => {
            Ok(Arc::new(AnthropicSummarizer::new(config)?))
        }
        SummarizationProviderKind::Openai => Ok(Arc::new(OpenAiSummarizer::new(config)?)),
        SummarizationProviderKind::Gemini => Ok(Arc::new(GenericHttpSummarizer::gemini(config)?)),
        SummarizationProviderKind::Grok => Ok(Arc::new(GenericHttpSummarizer::grok(config)?)),
        SummarizationProviderKind::Ollama => Ok(Arc::new(OllamaSummarizer::new(config))),
    }
}

fn require_api_key(env_var: &str, provider: &str) -> ProviderResult<String> {
    std::env::var(env_var).map_err(|_| ProviderError::Authentication {
        provider: provider.to_string(),
        message: format!("environment variable '{env_var}' is not set"),
    })
}

fn render_prompt(text: &str) -> String {
    DEFAULT_PROMPT_TEMPLATE.replace("{text}", text)
}

// =============================================================================
// Anthropic
// =============================================================================

pub struct AnthropicSummarizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicSummarizer {
    /// # Errors
    /// Returns an error if the configured API key environment variable is unset.
    pub fn new(config: &SummarizationConfig) -> ProviderResult<Self> {
        let api_key = require_api_key(&config.api_key_env, "anthropic")?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.anthropic.com/v1".to_string()),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    text: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[async_trait]
impl SummarizationProvider for AnthropicSummarizer {
    async fn summarize(&self, text: &str) -> ProviderResult<String> {
        let prompt = render_prompt(text);
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: 256,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &prompt,
            }],
        };
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "anthropic".to_string(),
                source,
            })?
            .json::<AnthropicResponse>()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "anthropic".to_string(),
                source,
            })?;

        response
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| ProviderError::Response {
                provider: "anthropic".to_string(),
                message: "empty content block list".to_string(),
            })
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// OpenAI (chat completions)
// =============================================================================

pub struct OpenAiSummarizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    /// # Errors
    /// Returns an error if the configured API key environment variable is unset.
    pub fn new(config: &SummarizationConfig) -> ProviderResult<Self> {
        let api_key = require_api_key(&config.api_key_env, "openai")?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[async_trait]
impl SummarizationProvider for OpenAiSummarizer {
    async fn summarize(&self, text: &str) -> ProviderResult<String> {
        let prompt = render_prompt(text);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "openai".to_string(),
                source,
            })?
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "openai".to_string(),
                source,
            })?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Response {
                provider: "openai".to_string(),
                message: "empty choices list".to_string(),
            })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Gemini / Grok - both speak an OpenAI-compatible chat completions surface
// =============================================================================

pub struct GenericHttpSummarizer {
    inner: OpenAiSummarizer,
    tag: &'static str,
}

impl GenericHttpSummarizer {
    /// # Errors
    /// Returns an error if the configured API key environment variable is unset.
    pub fn gemini(config: &SummarizationConfig) -> ProviderResult<Self> {
        let mut config = config.clone();
        if config.base_url.is_none() {
            config.base_url = Some(
                "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            );
        }
        Ok(Self {
            inner: OpenAiSummarizer::new(&config)?,
            tag: "gemini",
        })
    }

    /// # Errors
    /// Returns an error if the configured API key environment variable is unset.
    pub fn grok(config: &SummarizationConfig) -> ProviderResult<Self> {
        let mut config = config.clone();
        if config.base_url.is_none() {
            config.base_url = Some("https://api.x.ai/v1".to_string());
        }
        Ok(Self {
            inner: OpenAiSummarizer::new(&config)?,
            tag: "grok",
        })
    }
}

#[async_trait]
impl SummarizationProvider for GenericHttpSummarizer {
    async fn summarize(&self, text: &str) -> ProviderResult<String> {
        self.inner.summarize(text).await
    }

    fn name(&self) -> &str {
        self.tag
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

// =============================================================================
// Ollama
// =============================================================================

pub struct OllamaSummarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaSummarizer {
    #[must_use]
    pub fn new(config: &SummarizationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl SummarizationProvider for OllamaSummarizer {
    async fn summarize(&self, text: &str) -> ProviderResult<String> {
        let prompt = render_prompt(text);
        let request = OllamaGenerateRequest {
            model: &self.model,
            prompt: &prompt,
            stream: false,
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|_source| ProviderError::OllamaConnection {
                base_url: self.base_url.clone(),
            })?
            .json::<OllamaGenerateResponse>()
            .await
            .map_err(|source| ProviderError::Request {
                provider: "ollama".to_string(),
                source,
            })?;

        Ok(response.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
