//! Entity/relation data model: an arena of interned entity ids and edge
//! records, no owning back-pointers (see `S4`/cyclic-reference handling
//! discussed for graph traversal).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GraphResult;

pub type EntityId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub src: EntityId,
    pub relation: String,
    pub dst: EntityId,
    pub provenance_chunk_id: String,
}

/// A scored hop discovered by traversal, used to build `multi` mode's RRF
/// fusion input.
#[derive(Debug, Clone)]
pub struct GraphHit {
    pub chunk_id: String,
    pub score: f32,
    pub path: Vec<EntityId>,
}

#[async_trait]
pub trait GraphIndex: Send + Sync {
    /// Insert edges discovered while indexing one chunk. Idempotent:
    /// re-inserting the same `(src, relation, dst, provenance_chunk_id)`
    /// tuple is a no-op.
    async fn insert_edges(&self, edges: Vec<Edge>) -> GraphResult<()>;

    /// Traverse outward from `seed_entities` up to `depth` hops, scoring
    /// each reached chunk by path length (shorter is better) and relation
    /// relevance. Results are ranked, not yet fused with other retrievers.
    async fn traverse(&self, seed_entities: &[EntityId], depth: u32) -> GraphResult<Vec<GraphHit>>;

    /// Number of distinct entities currently indexed.
    async fn entity_count(&self) -> GraphResult<usize>;

    /// Wipe all edges.
    async fn reset(&self) -> GraphResult<()>;

    /// Flush the in-memory arena to disk, if the implementation persists.
    async fn persist(&self) -> GraphResult<()>;
}
