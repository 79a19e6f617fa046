use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rand::Rng;
use rand::SeedableRng;
use tracing::debug;

use crate::application::EmbeddingService;
use crate::domain::OracleResult;

/// Deterministic, hash-seeded embeddings for tests and environments without
/// model artifacts on disk (spec §4.6's fallback path).
pub struct MockEmbedding {
    model_name: String,
    dimensions: usize,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(384)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            model_name: "mock-embedding".to_string(),
            dimensions,
        }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut vector: Vec<f32> = (0..self.dimensions).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }
        vector
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> OracleResult<Vec<Vec<f32>>> {
        let vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.generate(t)).collect();
        debug!(count = vectors.len(), "generated mock embeddings");
        Ok(vectors)
    }

    async fn embed_query(&self, query: &str) -> OracleResult<Vec<f32>> {
        Ok(self.generate(query))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn is_consistent_for_the_same_text() {
        let service = MockEmbedding::new();
        let a = service.embed_query("hello world").await.unwrap();
        let b = service.embed_query("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn respects_configured_dimensions() {
        let service = MockEmbedding::with_dimensions(128);
        let embedding = service.embed_query("test").await.unwrap();
        assert_eq!(embedding.len(), 128);
    }

    #[tokio::test]
    async fn is_l2_normalized() {
        let service = MockEmbedding::new();
        let embedding = service.embed_query("test").await.unwrap();
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.001);
    }
}
