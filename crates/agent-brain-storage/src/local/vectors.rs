//! Embedded vector kNN via arroy (random-projection ANN) over an LMDB
//! (heed) environment.

use std::path::Path;

use arroy::distances::Cosine;
use arroy::{Database as ArroyDatabase, Reader, Writer};
use heed::types::{SerdeJson, Str, U32};
use heed::{Database, Env, EnvOpenOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{StorageError, StorageResult};

const DEFAULT_MAP_SIZE_MB: usize = 1024;

/// One stored document's ID alongside its arroy item id, so search results
/// (keyed by `u32`) can be mapped back to the caller's string chunk ids.
pub struct VectorIndex {
    env: Env,
    vectors: ArroyDatabase<Cosine>,
    id_to_chunk: Database<U32<heed::byteorder::BigEndian>, Str>,
    chunk_to_id: Database<Str, U32<heed::byteorder::BigEndian>>,
    next_id: std::sync::atomic::AtomicU32,
    dimensions: usize,
}

impl VectorIndex {
    /// Open (creating if absent) the vector index rooted at `dir`.
    ///
    /// # Errors
    /// Returns an error on filesystem or LMDB failure.
    pub fn open(dir: &Path, dimensions: usize) -> StorageResult<Self> {
        std::fs::create_dir_all(dir)?;
        let map_size_mb = std::env::var("AGENT_BRAIN_LMDB_MAP_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAP_SIZE_MB);

        // SAFETY: LMDB requires the caller to guarantee no other process
        // opens this environment with an incompatible map size concurrently;
        // this invariant is enforced by the runtime lock on the state
        // directory (only one agent-brain process owns it at a time).
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size_mb * 1024 * 1024)
                .max_dbs(10)
                .open(dir)?
        };

        let mut wtxn = env.write_txn()?;
        let vectors: ArroyDatabase<Cosine> = env.create_database(&mut wtxn, Some("vectors"))?;
        let id_to_chunk: Database<U32<heed::byteorder::BigEndian>, Str> =
            env.create_database(&mut wtxn, Some("id_to_chunk"))?;
        let chunk_to_id: Database<Str, U32<heed::byteorder::BigEndian>> =
            env.create_database(&mut wtxn, Some("chunk_to_id"))?;
        let next_id = id_to_chunk.len(&wtxn)? as u32;
        wtxn.commit()?;

        Ok(Self {
            env,
            vectors,
            id_to_chunk,
            chunk_to_id,
            next_id: std::sync::atomic::AtomicU32::new(next_id),
            dimensions,
        })
    }

    /// Insert or replace a chunk's embedding, keyed by its caller-supplied
    /// string id.
    pub fn upsert(&self, chunk_id: &str, embedding: &[f32]) -> StorageResult<()> {
        if embedding.len() != self.dimensions {
            return Err(StorageError::DimensionMismatch {
                stored: self.dimensions,
                current: embedding.len(),
            });
        }

        let mut wtxn = self.env.write_txn()?;
        let writer = Writer::new(self.vectors, 0, self.dimensions);

        let item_id = if let Some(existing) = self.chunk_to_id.get(&wtxn, chunk_id)? {
            existing
        } else {
            let assigned = self
                .next_id
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.chunk_to_id.put(&mut wtxn, chunk_id, &assigned)?;
            self.id_to_chunk.put(&mut wtxn, &assigned, chunk_id)?;
            assigned
        };

        writer.add_item(&mut wtxn, item_id, embedding)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Rebuild the ANN index over everything inserted so far. Must be
    /// called before [`Self::search`] sees newly-added items.
    pub fn build(&self) -> StorageResult<()> {
        let mut wtxn = self.env.write_txn()?;
        let writer = Writer::new(self.vectors, 0, self.dimensions);
        let mut rng = StdRng::from_entropy();
        writer.builder(&mut rng).build(&mut wtxn)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Raw kNN search, returning `(chunk_id, distance)` pairs. Distances
    /// are cosine distances (`1 - cosine_similarity`); normalize with
    /// [`crate::model::DistanceMetric::Cosine`] before surfacing to callers.
    pub fn search(&self, query: &[f32], limit: usize) -> StorageResult<Vec<(String, f32)>> {
        if query.len() != self.dimensions {
            return Err(StorageError::DimensionMismatch {
                stored: self.dimensions,
                current: query.len(),
            });
        }

        let rtxn = self.env.read_txn()?;
        let Ok(reader) = Reader::open(&rtxn, 0, self.vectors) else {
            return Ok(Vec::new());
        };

        let mut search = reader.nns(limit);
        if let Some(search_k) = std::num::NonZeroUsize::new(limit.saturating_mul(20).max(50)) {
            search.search_k(search_k);
        }
        let hits = search.by_vector(&rtxn, query)?;

        let mut results = Vec::with_capacity(hits.len());
        for (item_id, distance) in hits {
            if let Some(chunk_id) = self.id_to_chunk.get(&rtxn, &item_id)? {
                results.push((chunk_id.to_string(), distance));
            }
        }
        Ok(results)
    }

    pub fn delete(&self, chunk_id: &str) -> StorageResult<bool> {
        let mut wtxn = self.env.write_txn()?;
        let Some(item_id) = self.chunk_to_id.get(&wtxn, chunk_id)? else {
            return Ok(false);
        };
        let writer = Writer::new(self.vectors, 0, self.dimensions);
        let _ = writer.del_item(&mut wtxn, item_id);
        self.chunk_to_id.delete(&mut wtxn, chunk_id)?;
        self.id_to_chunk.delete(&mut wtxn, &item_id)?;
        wtxn.commit()?;
        Ok(true)
    }

    pub fn count(&self) -> StorageResult<u64> {
        let rtxn = self.env.read_txn()?;
        Ok(self.id_to_chunk.len(&rtxn)?)
    }

    pub fn clear(&self) -> StorageResult<()> {
        let mut wtxn = self.env.write_txn()?;
        self.id_to_chunk.clear(&mut wtxn)?;
        self.chunk_to_id.clear(&mut wtxn)?;
        self.vectors.clear(&mut wtxn)?;
        wtxn.commit()?;
        self.next_id.store(0, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

/// Tiny key/value record store for the handful of strongly-typed settings
/// the local backend needs outside the vector/keyword indices: the
/// embedding provenance triple.
pub struct RecordStore {
    env: Env,
    db: Database<Str, SerdeJson<serde_json::Value>>,
}

impl RecordStore {
    pub fn open(env: &Env) -> StorageResult<Self> {
        let mut wtxn = env.write_txn()?;
        let db = env.create_database(&mut wtxn, Some("records"))?;
        wtxn.commit()?;
        Ok(Self {
            env: env.clone(),
            db,
        })
    }

    pub fn get(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db.get(&rtxn, key)?)
    }

    pub fn put(&self, key: &str, value: &serde_json::Value) -> StorageResult<()> {
        let mut wtxn = self.env.write_txn()?;
        self.db.put(&mut wtxn, key, value)?;
        wtxn.commit()?;
        Ok(())
    }

    pub fn clear(&self) -> StorageResult<()> {
        let mut wtxn = self.env.write_txn()?;
        self.db.clear(&mut wtxn)?;
        wtxn.commit()?;
        Ok(())
    }
}
