//! Capability-based provider registry
//!
//! Agent Brain never hard-codes a concrete embedding/summarization/reranker
//! implementation into the core pipeline: every call site asks for a
//! `dyn EmbeddingProvider` (etc.) built from configuration, so switching
//! from OpenAI to Ollama is a config change, not a code change.

pub mod embedding;
pub mod error;
pub mod reranker;
pub mod summarization;

pub use embedding::{build_embedding_provider, EmbeddingProvider};
pub use error::{ProviderError, ProviderResult};
pub use reranker::{build_reranker_provider, RerankerProvider};
pub use summarization::{build_summarization_provider, SummarizationProvider};

use serde::{Deserialize, Serialize};

/// Recorded once per collection on first write, per spec's embedding
/// provenance invariant: `(provider, model, dimensions)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingProvenance {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

/// Outcome of comparing the currently configured embedding provider
/// against a collection's recorded provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvenanceCheck {
    /// Everything matches.
    Compatible,
    /// Provider and/or model differ but dimensionality matches - indexed
    /// data is still readable, but scores may be less meaningful. A warning,
    /// not a hard failure.
    ProviderMismatch { indexed: EmbeddingProvenance },
    /// Dimensionality differs - indexed vectors are structurally
    /// incompatible with the current embedder. Critical: queries and
    /// further writes against this collection must be refused.
    DimensionMismatch { indexed: EmbeddingProvenance },
}

/// Compare a live provenance triple against what's recorded for a
/// collection. Dimension mismatch is always reported, regardless of
/// whether provider/model also differ, since it is the one that makes the
/// stored vectors unusable.
#[must_use]
pub fn check_provenance(
    current: &EmbeddingProvenance,
    indexed: &EmbeddingProvenance,
) -> ProvenanceCheck {
    if current.dimensions != indexed.dimensions {
        return ProvenanceCheck::DimensionMismatch {
            indexed: indexed.clone(),
        };
    }
    if current.provider != indexed.provider || current.model != indexed.model {
        return ProvenanceCheck::ProviderMismatch {
            indexed: indexed.clone(),
        };
    }
    ProvenanceCheck::Compatible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance(provider: &str, model: &str, dimensions: usize) -> EmbeddingProvenance {
        EmbeddingProvenance {
            provider: provider.to_string(),
            model: model.to_string(),
            dimensions,
        }
    }

    #[test]
    fn identical_provenance_is_compatible() {
        let p = provenance("openai", "text-embedding-3-large", 3072);
        assert_eq!(check_provenance(&p, &p), ProvenanceCheck::Compatible);
    }

    #[test]
    fn dimension_change_is_always_critical() {
        let current = provenance("openai", "text-embedding-3-large", 1536);
        let indexed = provenance("openai", "text-embedding-3-large", 3072);
        assert_eq!(
            check_provenance(&current, &indexed),
            ProvenanceCheck::DimensionMismatch { indexed }
        );
    }

    #[test]
    fn provider_change_with_same_dims_is_a_warning() {
        let current = provenance("ollama", "nomic-embed-text", 768);
        let indexed = provenance("cohere", "embed-english-v3", 768);
        assert_eq!(
            check_provenance(&current, &indexed),
            ProvenanceCheck::ProviderMismatch { indexed }
        );
    }
}
