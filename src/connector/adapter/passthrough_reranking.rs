use async_trait::async_trait;

use crate::application::RerankingService;
use crate::domain::{OracleResult, RetrievedChunk};

/// Identity reranker (spec §4.9 `Passthrough` variant): keeps fusion order,
/// returning the first `top_n` candidates with score `1.0`. Used when no
/// reranking model is configured and as the Reranker's fallback after
/// Remote/Local fail.
pub struct PassthroughReranking;

impl PassthroughReranking {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PassthroughReranking {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RerankingService for PassthroughReranking {
    async fn rerank(
        &self,
        _query: &str,
        candidates: Vec<RetrievedChunk>,
        top_n: usize,
    ) -> OracleResult<Vec<RetrievedChunk>> {
        Ok(candidates.iter().take(top_n).map(|c| c.with_score(1.0)).collect())
    }

    fn model_name(&self) -> &str {
        "passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SymbolType;
    use crate::domain::{Chunk, Language};

    #[tokio::test]
    async fn preserves_input_order() {
        let reranker = PassthroughReranking::new();
        let chunks = vec![
            Chunk::new("a.rs", "fn a() { 1 }", 1, 1, Language::Rust, SymbolType::Function).with_id(1),
            Chunk::new("b.rs", "fn b() { 2 }", 1, 1, Language::Rust, SymbolType::Function).with_id(2),
        ];
        let candidates: Vec<RetrievedChunk> = chunks
            .iter()
            .map(|c| RetrievedChunk::from_chunk(c, 0.3))
            .collect();

        let reranked = reranker.rerank("query", candidates, 10).await.unwrap();
        assert_eq!(reranked[0].id(), 1);
        assert_eq!(reranked[1].id(), 2);
        assert!(reranked.iter().all(|c| c.score() == 1.0));
    }

    #[tokio::test]
    async fn truncates_to_top_n() {
        let reranker = PassthroughReranking::new();
        let chunks = vec![
            Chunk::new("a.rs", "fn a() { 1 }", 1, 1, Language::Rust, SymbolType::Function).with_id(1),
            Chunk::new("b.rs", "fn b() { 2 }", 1, 1, Language::Rust, SymbolType::Function).with_id(2),
            Chunk::new("c.rs", "fn c() { 3 }", 1, 1, Language::Rust, SymbolType::Function).with_id(3),
        ];
        let candidates: Vec<RetrievedChunk> = chunks
            .iter()
            .map(|c| RetrievedChunk::from_chunk(c, 0.3))
            .collect();

        let reranked = reranker.rerank("query", candidates, 2).await.unwrap();
        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].id(), 1);
        assert_eq!(reranked[1].id(), 2);
    }
}
