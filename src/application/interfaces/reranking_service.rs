use async_trait::async_trait;

use crate::domain::{OracleResult, RetrievedChunk};

/// Reorders fused candidates by query relevance (spec §4.9).
///
/// Implementations return results sorted by descending score; callers must
/// not assume the input order carries any meaning once reranked. If
/// `candidates.len() <= top_n`, implementations must bypass the model
/// entirely and return the candidates scored `1.0` (spec §4.9's bypass
/// rule), since there is nothing left to rank away.
#[async_trait]
pub trait RerankingService: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievedChunk>,
        top_n: usize,
    ) -> OracleResult<Vec<RetrievedChunk>>;

    fn model_name(&self) -> &str;
}
