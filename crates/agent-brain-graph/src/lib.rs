//! Optional graph index: entity/relation arena built during indexing,
//! queried via bounded-depth traversal for `graph`/`multi` query modes.
//!
//! Gated entirely behind [`agent_brain_config::GraphConfig::enabled`] - the
//! rest of the system treats a disabled graph as simply absent.

pub mod arena;
pub mod error;
pub mod extract;
pub mod model;
pub mod persist;

pub use arena::ArenaGraphIndex;
pub use error::{GraphError, GraphResult};
pub use model::{Edge, EntityId, GraphHit, GraphIndex};

use std::sync::Arc;

use agent_brain_config::GraphConfig;
use agent_brain_providers::SummarizationProvider;

/// Build the edges for one chunk, combining whichever extractors
/// `config` enables, capped at `max_triplets_per_chunk` combined.
///
/// # Errors
/// Propagates the LLM extractor's provider error, if enabled and it fails.
pub async fn extract_edges_for_chunk(
    config: &GraphConfig,
    llm: Option<&Arc<dyn SummarizationProvider>>,
    source: &str,
    language: Option<&str>,
    text: &str,
    provenance_chunk_id: &str,
) -> GraphResult<Vec<Edge>> {
    if !config.enabled {
        return Ok(Vec::new());
    }

    let mut triplets = Vec::new();
    if config.use_code_metadata {
        triplets.extend(extract::rule_based_extract(source, language, text));
    }
    if config.use_llm_extraction {
        if let Some(provider) = llm {
            let remaining = config.max_triplets_per_chunk.saturating_sub(triplets.len());
            if remaining > 0 {
                triplets.extend(extract::llm_extract(provider, text, remaining).await?);
            }
        }
    }
    triplets.truncate(config.max_triplets_per_chunk);

    Ok(extract::triplets_to_edges(triplets, provenance_chunk_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_config_yields_no_edges() {
        let config = GraphConfig {
            enabled: false,
            ..GraphConfig::default()
        };
        let edges = extract_edges_for_chunk(&config, None, "a.rs", Some("rust"), "fn x() {}", "c1")
            .await
            .unwrap();
        assert!(edges.is_empty());
    }

    #[tokio::test]
    async fn enabled_config_runs_rule_based_extractor() {
        let config = GraphConfig {
            enabled: true,
            use_llm_extraction: false,
            ..GraphConfig::default()
        };
        let edges = extract_edges_for_chunk(&config, None, "a.rs", Some("rust"), "fn hello() {}", "c1")
            .await
            .unwrap();
        assert!(edges.iter().any(|e| e.dst == "hello"));
        assert!(edges.iter().all(|e| e.provenance_chunk_id == "c1"));
    }
}
