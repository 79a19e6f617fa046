use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use usearch::ffi::{IndexOptions, MetricKind, ScalarKind};

use crate::application::{VectorHit, VectorIndex};
use crate::domain::{OracleError, OracleResult};

/// Construction parameters (spec §4.7) — these field names are
/// `usearch::IndexOptions`'s own, which is why usearch is the obvious
/// backing library for this component.
const DIMENSIONS: usize = 384;
const CONNECTIVITY: usize = 16;
const EXPANSION_ADD: usize = 128;
const EXPANSION_SEARCH: usize = 64;
const INITIAL_CAPACITY: usize = 65536;

/// usearch-backed HNSW vector index (spec §4.7). `add`/`remove` key
/// embeddings by the chunk's `id`; `search` returns cosine distances
/// converted to a similarity score (`1.0 - distance`) so higher is better,
/// matching [`LexicalHit`](crate::application::LexicalHit)'s convention.
pub struct UsearchVectorIndex {
    index: RwLock<usearch::Index>,
    path: PathBuf,
}

impl UsearchVectorIndex {
    pub fn open(path: impl AsRef<Path>) -> OracleResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(OracleError::Io)?;
        }

        let options = IndexOptions {
            dimensions: DIMENSIONS,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: CONNECTIVITY,
            expansion_add: EXPANSION_ADD,
            expansion_search: EXPANSION_SEARCH,
            multi: false,
        };

        let index = usearch::Index::new(&options)
            .map_err(|e| OracleError::internal(format!("failed to create vector index: {e}")))?;

        if path.exists() {
            index.load(path.to_string_lossy().as_ref()).map_err(|e| {
                OracleError::corrupt(format!(
                    "failed to load vector index (dimensions/metric mismatch or corrupt file): {e}"
                ))
            })?;
            info!(?path, size = index.size(), "loaded existing vector index");
        } else {
            index
                .reserve(INITIAL_CAPACITY)
                .map_err(|e| OracleError::internal(format!("failed to reserve vector index capacity: {e}")))?;
            info!(?path, "created new vector index");
        }

        Ok(Self { index: RwLock::new(index), path })
    }

    fn ensure_capacity(index: &usearch::Index) -> OracleResult<()> {
        if index.size() + 1 > index.capacity() {
            let new_capacity = (index.capacity() * 2).max(INITIAL_CAPACITY);
            index
                .reserve(new_capacity)
                .map_err(|e| OracleError::internal(format!("failed to grow vector index: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for UsearchVectorIndex {
    async fn add(&self, chunk_id: i64, embedding: &[f32]) -> OracleResult<()> {
        if embedding.len() != DIMENSIONS {
            return Err(OracleError::invalid_input(format!(
                "expected a {DIMENSIONS}-dimensional embedding, got {}",
                embedding.len()
            )));
        }

        let index = self.index.write().map_err(|_| OracleError::internal("vector index lock poisoned"))?;
        Self::ensure_capacity(&index)?;

        let key = chunk_id as u64;
        if index.contains(key) {
            let _ = index.remove(key);
        }

        index
            .add(key, embedding)
            .map_err(|e| OracleError::internal(format!("failed to add vector: {e}")))?;
        Ok(())
    }

    async fn remove(&self, chunk_id: i64) -> OracleResult<()> {
        let index = self.index.write().map_err(|_| OracleError::internal("vector index lock poisoned"))?;
        let key = chunk_id as u64;
        if index.contains(key) {
            index
                .remove(key)
                .map_err(|e| OracleError::internal(format!("failed to remove vector: {e}")))?;
        }
        Ok(())
    }

    async fn clear(&self) -> OracleResult<()> {
        let mut guard = self.index.write().map_err(|_| OracleError::internal("vector index lock poisoned"))?;
        let options = IndexOptions {
            dimensions: DIMENSIONS,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: CONNECTIVITY,
            expansion_add: EXPANSION_ADD,
            expansion_search: EXPANSION_SEARCH,
            multi: false,
        };
        let fresh = usearch::Index::new(&options)
            .map_err(|e| OracleError::internal(format!("failed to recreate vector index: {e}")))?;
        fresh
            .reserve(INITIAL_CAPACITY)
            .map_err(|e| OracleError::internal(format!("failed to reserve vector index capacity: {e}")))?;
        *guard = fresh;
        debug!(path = %self.path.display(), "vector index cleared");
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> OracleResult<Vec<VectorHit>> {
        let index = self.index.read().map_err(|_| OracleError::internal("vector index lock poisoned"))?;

        if index.size() == 0 {
            return Ok(vec![]);
        }

        let matches = index
            .search(query_embedding, limit)
            .map_err(|e| OracleError::internal(format!("vector search failed: {e}")))?;

        let hits = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&key, &distance)| VectorHit {
                chunk_id: key as i64,
                score: 1.0 - distance,
            })
            .collect();

        Ok(hits)
    }

    async fn save(&self) -> OracleResult<()> {
        let index = self.index.read().map_err(|_| OracleError::internal("vector index lock poisoned"))?;
        index
            .save(self.path.to_string_lossy().as_ref())
            .map_err(|e| OracleError::internal(format!("failed to save vector index: {e}")))?;
        debug!(path = %self.path.display(), "vector index persisted");
        Ok(())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn count(&self) -> OracleResult<u64> {
        let index = self.index.read().map_err(|_| OracleError::internal("vector index lock poisoned"))?;
        Ok(index.size() as u64)
    }
}

impl Drop for UsearchVectorIndex {
    fn drop(&mut self) {
        if let Ok(index) = self.index.read() {
            if let Err(e) = index.save(self.path.to_string_lossy().as_ref()) {
                warn!(error = %e, "failed to persist vector index on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(seed: f32) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMENSIONS];
        v[0] = seed;
        v[1] = 1.0;
        v
    }

    #[tokio::test]
    async fn add_then_search_finds_the_nearest_vector() {
        let dir = tempfile::tempdir().unwrap();
        let index = UsearchVectorIndex::open(dir.path().join("vectors.usearch")).unwrap();

        index.add(1, &embedding(0.0)).await.unwrap();
        index.add(2, &embedding(10.0)).await.unwrap();

        let hits = index.search(&embedding(0.0), 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, 1);
    }

    #[tokio::test]
    async fn rejects_mismatched_embedding_dimensionality() {
        let dir = tempfile::tempdir().unwrap();
        let index = UsearchVectorIndex::open(dir.path().join("vectors.usearch")).unwrap();
        let err = index.add(1, &[0.0, 1.0]).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn remove_drops_the_vector_from_search_results() {
        let dir = tempfile::tempdir().unwrap();
        let index = UsearchVectorIndex::open(dir.path().join("vectors.usearch")).unwrap();
        index.add(1, &embedding(0.0)).await.unwrap();
        index.remove(1).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_drops_every_vector() {
        let dir = tempfile::tempdir().unwrap();
        let index = UsearchVectorIndex::open(dir.path().join("vectors.usearch")).unwrap();
        index.add(1, &embedding(0.0)).await.unwrap();
        index.add(2, &embedding(10.0)).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);

        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);

        index.add(3, &embedding(5.0)).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_then_reopen_round_trips_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.usearch");
        {
            let index = UsearchVectorIndex::open(&path).unwrap();
            index.add(1, &embedding(0.0)).await.unwrap();
            index.save().await.unwrap();
        }

        let reopened = UsearchVectorIndex::open(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }
}
