use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::application::use_cases::rrf_fuse::{rrf_fuse, FusedId};
use crate::application::{ChunkStore, EmbeddingService, LexicalIndex, RerankingService, VectorIndex};
use crate::domain::{OracleResult, RetrievedChunk};

/// Two-stage hybrid retrieval: fuse lexical + vector candidates with RRF,
/// then (optionally) rerank with a cross-encoder (spec §4.11).
pub struct SearchCodeUseCase {
    chunk_store: Arc<dyn ChunkStore>,
    lexical_index: Arc<dyn LexicalIndex>,
    vector_index: Arc<dyn VectorIndex>,
    embedding_service: Arc<dyn EmbeddingService>,
    reranking_service: Arc<dyn RerankingService>,
}

/// Per-leg candidate counts and the fusion constant, exposed so the CLI and
/// config layer can override the defaults named in spec §4.11.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub bm25_limit: usize,
    pub vector_limit: usize,
    pub fusion_limit: usize,
    pub rrf_k: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            bm25_limit: 200,
            vector_limit: 100,
            fusion_limit: 30,
            rrf_k: 60.0,
        }
    }
}

impl SearchCodeUseCase {
    pub fn new(
        chunk_store: Arc<dyn ChunkStore>,
        lexical_index: Arc<dyn LexicalIndex>,
        vector_index: Arc<dyn VectorIndex>,
        embedding_service: Arc<dyn EmbeddingService>,
        reranking_service: Arc<dyn RerankingService>,
    ) -> Self {
        Self {
            chunk_store,
            lexical_index,
            vector_index,
            embedding_service,
            reranking_service,
        }
    }

    /// Runs lexical search and query embedding concurrently, fuses the two
    /// candidate lists with RRF, hydrates the winners from the Chunk Store,
    /// then reranks (spec §4.11 steps 1-8).
    pub async fn hybrid_search(
        &self,
        query: &str,
        params: SearchParams,
    ) -> OracleResult<Vec<RetrievedChunk>> {
        info!(%query, "hybrid search");
        let start = Instant::now();

        if query.trim().is_empty() {
            return Ok(vec![]);
        }

        let (lexical_hits, query_embedding) = tokio::join!(
            self.lexical_index.search(query, params.bm25_limit),
            self.embedding_service.embed_query(query),
        );
        let lexical_hits = lexical_hits?;
        let query_embedding = query_embedding?;

        let vector_hits = self
            .vector_index
            .search(&query_embedding, params.vector_limit)
            .await?;

        debug!(
            lexical = lexical_hits.len(),
            vector = vector_hits.len(),
            "candidates fetched"
        );

        let fused = rrf_fuse(&lexical_hits, &vector_hits, params.rrf_k, params.fusion_limit);

        let mut results = Vec::with_capacity(fused.len());
        for candidate in &fused {
            let chunk = match &candidate.id {
                FusedId::Vector(chunk_id) => self.chunk_store.get(*chunk_id).await?,
                FusedId::Lexical(lexical_id) => {
                    self.chunk_store.get_by_lexical_id(lexical_id).await?
                }
            };
            if let Some(chunk) = chunk {
                results.push(RetrievedChunk::from_chunk(&chunk, candidate.score));
            }
        }

        let results = self.reranking_service.rerank(query, results, params.fusion_limit).await?;

        info!(
            count = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "hybrid search complete"
        );
        Ok(results)
    }
}
