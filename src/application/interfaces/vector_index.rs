use async_trait::async_trait;

use crate::domain::OracleResult;

/// A result from the Vector Index: the owning chunk's id and cosine
/// similarity score (spec §4.7, §4.8).
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub chunk_id: i64,
    pub score: f32,
}

/// HNSW-backed approximate nearest-neighbor search over chunk embeddings
/// (spec §4.7).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Adds or replaces the embedding for `chunk_id`.
    async fn add(&self, chunk_id: i64, embedding: &[f32]) -> OracleResult<()>;

    async fn remove(&self, chunk_id: i64) -> OracleResult<()>;

    /// Removes every embedding, for a full rebuild (spec §4.10 step 2).
    async fn clear(&self) -> OracleResult<()>;

    /// Top `limit` nearest neighbors of `embedding` by cosine similarity.
    async fn search(&self, embedding: &[f32], limit: usize) -> OracleResult<Vec<VectorHit>>;

    /// Persists the index to disk in the backing engine's native format
    /// (spec §6).
    async fn save(&self) -> OracleResult<()>;

    fn dimensions(&self) -> usize;

    async fn count(&self) -> OracleResult<u64>;
}
