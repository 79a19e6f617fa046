use async_trait::async_trait;

use crate::domain::{LexicalDocument, OracleResult};

/// A result from the Lexical Index: the document's string key and its BM25
/// score (spec §4.5, §4.8).
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub id_str: String,
    pub score: f32,
}

/// BM25-backed lexical search over [`LexicalDocument`]s (spec §4.5).
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    async fn add_batch(&self, documents: Vec<LexicalDocument>) -> OracleResult<()>;

    async fn delete(&self, id_str: &str) -> OracleResult<()>;

    /// Removes every document, for a full rebuild (spec §4.10 step 2).
    async fn clear(&self) -> OracleResult<()>;

    /// Top `limit` documents scored by BM25 against `query`.
    async fn search(&self, query: &str, limit: usize) -> OracleResult<Vec<LexicalHit>>;

    /// Persists the index to disk (spec §6: opaque binary round-trip unit).
    async fn save(&self) -> OracleResult<()>;

    async fn count(&self) -> OracleResult<u64>;
}
