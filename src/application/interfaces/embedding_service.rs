use async_trait::async_trait;

use crate::domain::OracleResult;

/// Generates dense embeddings for chunk content and queries (spec §4.6).
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> OracleResult<Vec<Vec<f32>>>;

    async fn embed_query(&self, query: &str) -> OracleResult<Vec<f32>>;

    /// The dimensionality of vectors this service produces, matching the
    /// Vector Index's configured `dimensions` (spec §4.7).
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}
