use async_trait::async_trait;

use crate::domain::{Chunk, OracleResult};

/// Persisted, queryable storage for [`Chunk`]s (spec §4.4).
///
/// Implementations own schema creation and migration; `open` must be
/// idempotent across process restarts against the same path.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Inserts chunks, assigning each a fresh `id`. Returns the chunks as
    /// persisted (with `id`/`indexed_at` populated), in input order.
    async fn insert_batch(&self, chunks: Vec<Chunk>) -> OracleResult<Vec<Chunk>>;

    /// Deletes every chunk belonging to `file_path`. Returns the ids that
    /// were removed, so callers can evict them from the Lexical/Vector
    /// Index too.
    async fn delete_by_file_path(&self, file_path: &str) -> OracleResult<Vec<i64>>;

    /// Clears the table in O(rows); used by `full_index` to rebuild from
    /// scratch (spec §4.4, §4.10 step 2).
    async fn delete_all(&self) -> OracleResult<()>;

    /// All chunks belonging to `file_path`.
    async fn list_by_file(&self, file_path: &str) -> OracleResult<Vec<Chunk>>;

    /// Any one chunk whose `content_hash` matches `hash`, if one exists.
    async fn get_by_hash(&self, hash: &str) -> OracleResult<Option<Chunk>>;

    /// The distinct set of file paths currently represented in the store,
    /// ascending.
    async fn list_file_paths(&self) -> OracleResult<Vec<String>>;

    /// The distinct set of file paths currently represented in the store,
    /// each paired with the content hash of its most recently indexed
    /// chunk set — used by the Indexer Orchestrator's incremental diff.
    async fn file_hashes(&self) -> OracleResult<Vec<(String, String)>>;

    /// Every chunk currently stored, in ascending `id` order. Used to
    /// rebuild the Lexical and Vector Index from scratch.
    async fn list_all(&self) -> OracleResult<Vec<Chunk>>;

    async fn get(&self, id: i64) -> OracleResult<Option<Chunk>>;

    /// Batched lookup for result hydration; returned order is unspecified
    /// and ids with no matching row are simply absent from the result.
    async fn get_many(&self, ids: &[i64]) -> OracleResult<Vec<Chunk>>;

    /// Resolves a Lexical Index key (`file_path:start_line`) back to its
    /// chunk, used when fusing a lexical-only hit with its chunk id.
    async fn get_by_lexical_id(&self, lexical_id: &str) -> OracleResult<Option<Chunk>>;

    async fn count(&self) -> OracleResult<u64>;

    /// The schema version currently applied (`PRAGMA user_version`).
    async fn schema_version(&self) -> OracleResult<i64>;
}
