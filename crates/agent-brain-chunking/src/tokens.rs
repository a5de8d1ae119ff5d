//! Token counting, used to size chunk/embedding batches against a
//! provider's context window.

use std::sync::OnceLock;

use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};

use crate::error::{ChunkingError, ChunkingResult};

/// Counts tokens for a specific model's tokenizer.
pub trait TokenCounter: Send + Sync {
    fn name(&self) -> &str;
    fn max_tokens(&self) -> usize;
    fn count(&self, text: &str) -> usize;
    fn count_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.count(t)).collect()
    }
}

pub struct TiktokenCounter {
    model_name: String,
    encoder: CoreBPE,
    max_tokens: usize,
}

impl TiktokenCounter {
    /// # Errors
    /// Returns an error if the tokenizer tables fail to load.
    pub fn new(model_name: &str, max_tokens: usize) -> ChunkingResult<Self> {
        let encoder = Self::encoder_for_model(model_name)?;
        Ok(Self {
            model_name: model_name.to_string(),
            encoder,
            max_tokens,
        })
    }

    fn encoder_for_model(model_name: &str) -> ChunkingResult<CoreBPE> {
        let encoder = if model_name.starts_with("o1") || model_name.starts_with("gpt-4o") {
            o200k_base()
        } else {
            cl100k_base()
        };
        encoder.map_err(|e| ChunkingError::TokenCounting(e.to_string()))
    }
}

impl TokenCounter for TiktokenCounter {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn count(&self, text: &str) -> usize {
        self.encoder.encode_ordinary(text).len()
    }

    fn count_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts
            .iter()
            .map(|text| self.encoder.encode_ordinary(text).len())
            .collect()
    }
}

/// The chunker's default counter: cl100k_base, shared process-wide since
/// building the encoder loads its BPE rank tables from disk/embedded data.
///
/// # Panics
/// Panics if the cl100k_base tokenizer tables fail to load - the chunker
/// has no fallback for counting tokens without them.
#[must_use]
pub fn default_counter() -> &'static dyn TokenCounter {
    static COUNTER: OnceLock<TiktokenCounter> = OnceLock::new();
    COUNTER.get_or_init(|| {
        TiktokenCounter::new("gpt-4", usize::MAX).expect("cl100k_base tokenizer tables must load")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_simple_text() {
        let counter = TiktokenCounter::new("gpt-4", 8192).unwrap();
        assert!(counter.count("Hello, world!") > 0);
        assert_eq!(counter.count(""), 0);
    }

    #[test]
    fn batch_matches_individual_counts() {
        let counter = TiktokenCounter::new("gpt-4", 8192).unwrap();
        let texts = ["one", "two words", "three words here"];
        let batch = counter.count_batch(&texts);
        let individual: Vec<usize> = texts.iter().map(|t| counter.count(t)).collect();
        assert_eq!(batch, individual);
    }
}
