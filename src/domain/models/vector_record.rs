use serde::{Deserialize, Serialize};

/// A dense embedding keyed by the owning chunk's integer id (spec §3,
/// §4.7). This is what the Vector Index stores and returns from a
/// nearest-neighbor search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    chunk_id: i64,
    embedding: Vec<f32>,
}

impl VectorRecord {
    pub fn new(chunk_id: i64, embedding: Vec<f32>) -> Self {
        Self { chunk_id, embedding }
    }

    pub fn chunk_id(&self) -> i64 {
        self.chunk_id
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_chunk_id_and_embedding() {
        let record = VectorRecord::new(7, vec![0.1, 0.2, 0.3]);
        assert_eq!(record.chunk_id(), 7);
        assert_eq!(record.dimensions(), 3);
        assert_eq!(record.embedding(), &[0.1, 0.2, 0.3]);
    }
}
