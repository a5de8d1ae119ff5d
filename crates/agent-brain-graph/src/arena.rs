//! In-memory arena graph index: entities live as `HashMap` keys, edges are
//! plain records referencing entity ids by value. No owning back-pointers,
//! so cyclic entity references traverse without special-casing - a BFS
//! frontier with a visited-set naturally terminates.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::GraphResult;
use crate::model::{Edge, EntityId, GraphHit, GraphIndex};
use crate::persist;

#[derive(Default)]
struct State {
    /// Outgoing edges per source entity.
    outgoing: HashMap<EntityId, Vec<Edge>>,
    /// Dedupe set over `(src, relation, dst, provenance_chunk_id)`.
    seen: HashSet<(EntityId, String, EntityId, String)>,
}

pub struct ArenaGraphIndex {
    state: Arc<RwLock<State>>,
    snapshot_path: Option<PathBuf>,
}

impl ArenaGraphIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            snapshot_path: None,
        }
    }

    /// Load a previously persisted snapshot from `dir/index_subdir`, or
    /// start empty if none exists yet.
    ///
    /// # Errors
    /// Returns an error if a snapshot exists but fails to parse.
    pub async fn open(snapshot_dir: &std::path::Path) -> GraphResult<Self> {
        let path = snapshot_dir.join("edges.json");
        let edges = persist::load(&path).await?;
        let mut state = State::default();
        for edge in edges {
            insert_one(&mut state, edge);
        }
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            snapshot_path: Some(path),
        })
    }
}

impl Default for ArenaGraphIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_one(state: &mut State, edge: Edge) {
    let key = (
        edge.src.clone(),
        edge.relation.clone(),
        edge.dst.clone(),
        edge.provenance_chunk_id.clone(),
    );
    if !state.seen.insert(key) {
        return;
    }
    state.outgoing.entry(edge.src.clone()).or_default().push(edge);
}

#[async_trait]
impl GraphIndex for ArenaGraphIndex {
    async fn insert_edges(&self, edges: Vec<Edge>) -> GraphResult<()> {
        let mut state = self.state.write().await;
        for edge in edges {
            insert_one(&mut state, edge);
        }
        Ok(())
    }

    async fn traverse(&self, seed_entities: &[EntityId], depth: u32) -> GraphResult<Vec<GraphHit>> {
        let state = self.state.read().await;
        let mut visited: HashSet<EntityId> = HashSet::new();
        let mut frontier: VecDeque<(EntityId, Vec<EntityId>, u32)> = VecDeque::new();
        let mut hits: Vec<GraphHit> = Vec::new();

        for seed in seed_entities {
            if visited.insert(seed.clone()) {
                frontier.push_back((seed.clone(), vec![seed.clone()], 0));
            }
        }

        while let Some((entity, path, hop)) = frontier.pop_front() {
            let Some(edges) = state.outgoing.get(&entity) else {
                continue;
            };
            for edge in edges {
                let mut next_path = path.clone();
                next_path.push(edge.dst.clone());
                let score = 1.0 / (hop + 1) as f32;
                hits.push(GraphHit {
                    chunk_id: edge.provenance_chunk_id.clone(),
                    score,
                    path: next_path.clone(),
                });
                if hop + 1 < depth && visited.insert(edge.dst.clone()) {
                    frontier.push_back((edge.dst.clone(), next_path, hop + 1));
                }
            }
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits)
    }

    async fn entity_count(&self) -> GraphResult<usize> {
        let state = self.state.read().await;
        let mut entities: HashSet<&EntityId> = HashSet::new();
        for (src, edges) in &state.outgoing {
            entities.insert(src);
            for edge in edges {
                entities.insert(&edge.dst);
            }
        }
        Ok(entities.len())
    }

    async fn reset(&self) -> GraphResult<()> {
        let mut state = self.state.write().await;
        state.outgoing.clear();
        state.seen.clear();
        Ok(())
    }

    async fn persist(&self) -> GraphResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let state = self.state.read().await;
        let edges: Vec<Edge> = state.outgoing.values().flatten().cloned().collect();
        persist::save(path, &edges).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(src: &str, relation: &str, dst: &str, chunk: &str) -> Edge {
        Edge {
            src: src.to_string(),
            relation: relation.to_string(),
            dst: dst.to_string(),
            provenance_chunk_id: chunk.to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_edges_are_deduped() {
        let graph = ArenaGraphIndex::new();
        graph
            .insert_edges(vec![edge("a", "calls", "b", "c1"), edge("a", "calls", "b", "c1")])
            .await
            .unwrap();
        assert_eq!(graph.entity_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn traversal_respects_depth_and_cycles() {
        let graph = ArenaGraphIndex::new();
        graph
            .insert_edges(vec![
                edge("a", "calls", "b", "c1"),
                edge("b", "calls", "a", "c2"),
                edge("b", "calls", "c", "c3"),
            ])
            .await
            .unwrap();

        let hits = graph.traverse(&["a".to_string()], 2).await.unwrap();
        let chunk_ids: HashSet<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert!(chunk_ids.contains("c1"));
        assert!(chunk_ids.contains("c3"));
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let graph = ArenaGraphIndex::new();
        graph.insert_edges(vec![edge("a", "calls", "b", "c1")]).await.unwrap();
        graph.reset().await.unwrap();
        assert_eq!(graph.entity_count().await.unwrap(), 0);
    }
}
