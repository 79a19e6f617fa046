use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::application::{
    ChunkStore, EmbeddingService, LexicalIndex, ParserService, RepositoryWalker, VectorIndex,
};
use crate::domain::{content_hash, Language, LexicalDocument, OracleError, OracleResult};

/// Summary statistics for an indexing run (spec §4.10).
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub files_discovered: u64,
    pub files_processed: u64,
    pub files_failed: u64,
    pub chunks_created: u64,
    pub duration_ms: u64,
}

/// Per-file progress callback: `(processed, total)`. The CLI wires this to
/// an `indicatif` progress bar (spec §9's "single reporting seam").
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Walks a repository, chunks and embeds its files, and builds the Chunk
/// Store / Lexical Index / Vector Index (spec §4.10).
pub struct IndexRepositoryUseCase {
    chunk_store: Arc<dyn ChunkStore>,
    lexical_index: Arc<dyn LexicalIndex>,
    vector_index: Arc<dyn VectorIndex>,
    parser_service: Arc<dyn ParserService>,
    embedding_service: Arc<dyn EmbeddingService>,
    walker: Arc<dyn RepositoryWalker>,
}

impl IndexRepositoryUseCase {
    pub fn new(
        chunk_store: Arc<dyn ChunkStore>,
        lexical_index: Arc<dyn LexicalIndex>,
        vector_index: Arc<dyn VectorIndex>,
        parser_service: Arc<dyn ParserService>,
        embedding_service: Arc<dyn EmbeddingService>,
        walker: Arc<dyn RepositoryWalker>,
    ) -> Self {
        Self {
            chunk_store,
            lexical_index,
            vector_index,
            parser_service,
            embedding_service,
            walker,
        }
    }

    /// Indexes every registered-language file under `repo_path` from
    /// scratch. Assumes the Chunk Store, Lexical Index and Vector Index are
    /// empty or are meant to be fully replaced.
    pub async fn full_index(
        &self,
        repo_path: &Path,
        progress: Option<&ProgressCallback>,
    ) -> OracleResult<IndexStats> {
        let start = Instant::now();

        self.chunk_store.delete_all().await?;
        self.lexical_index.clear().await?;
        self.vector_index.clear().await?;

        let files = self.discover_files(repo_path);
        let total = files.len() as u64;
        info!(total, "starting full index");

        let mut stats = IndexStats {
            files_discovered: total,
            ..Default::default()
        };

        for (processed, path) in files.iter().enumerate() {
            match self.index_one_file(repo_path, path).await {
                Ok(chunk_count) => {
                    stats.files_processed += 1;
                    stats.chunks_created += chunk_count;
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to index file");
                    stats.files_failed += 1;
                }
            }
            if let Some(cb) = progress {
                cb(processed as u64 + 1, total);
            }
        }

        self.lexical_index.save().await?;
        self.vector_index.save().await?;

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            processed = stats.files_processed,
            failed = stats.files_failed,
            chunks = stats.chunks_created,
            duration_ms = stats.duration_ms,
            "full index complete"
        );
        Ok(stats)
    }

    /// Re-indexes only files whose content changed since the last run, then
    /// rebuilds the Lexical and Vector Index from the Chunk Store's current
    /// contents — the "safe default" spec §9 recommends over a partial,
    /// diff-only index update.
    pub async fn update_index(
        &self,
        repo_path: &Path,
        progress: Option<&ProgressCallback>,
    ) -> OracleResult<IndexStats> {
        let start = Instant::now();

        let existing: HashMap<String, String> = self
            .chunk_store
            .file_hashes()
            .await?
            .into_iter()
            .collect();

        let current_files = self.discover_files(repo_path);
        let mut current_hashes: HashMap<String, String> = HashMap::new();
        for path in &current_files {
            let relative = relative_path(repo_path, path);
            if let Ok(bytes) = tokio::fs::read(path).await {
                current_hashes.insert(relative, content_hash(&bytes));
            }
        }

        let existing_paths: HashSet<&String> = existing.keys().collect();
        let current_paths: HashSet<&String> = current_hashes.keys().collect();

        let added_or_modified: Vec<&String> = current_paths
            .iter()
            .filter(|p| existing.get(***p) != current_hashes.get(***p))
            .copied()
            .collect();
        let deleted: Vec<&String> = existing_paths.difference(&current_paths).copied().collect();

        info!(
            changed = added_or_modified.len(),
            deleted = deleted.len(),
            "detected incremental changes"
        );

        let mut stats = IndexStats {
            files_discovered: current_files.len() as u64,
            ..Default::default()
        };

        for path in &deleted {
            self.chunk_store.delete_by_file_path(path).await?;
        }

        let total = added_or_modified.len() as u64;
        for (processed, relative) in added_or_modified.iter().enumerate() {
            let absolute = repo_path.join(relative);
            self.chunk_store.delete_by_file_path(relative).await?;
            match self.index_one_file(repo_path, &absolute).await {
                Ok(chunk_count) => {
                    stats.files_processed += 1;
                    stats.chunks_created += chunk_count;
                }
                Err(e) => {
                    warn!(file = %relative, error = %e, "failed to reindex file");
                    stats.files_failed += 1;
                }
            }
            if let Some(cb) = progress {
                cb(processed as u64 + 1, total);
            }
        }

        self.rebuild_lexical_and_vector_indexes().await?;

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            processed = stats.files_processed,
            failed = stats.files_failed,
            duration_ms = stats.duration_ms,
            "incremental index complete"
        );
        Ok(stats)
    }

    /// Rebuilds the Lexical and Vector Index from every chunk currently in
    /// the Chunk Store. Parsing and embedding already happened incrementally
    /// above; this is comparatively cheap since it only re-derives the two
    /// index structures from already-computed content.
    async fn rebuild_lexical_and_vector_indexes(&self) -> OracleResult<()> {
        let chunks = self.chunk_store.list_all().await?;
        debug!(count = chunks.len(), "rebuilding lexical + vector indexes");

        let documents: Vec<LexicalDocument> = chunks.iter().map(LexicalDocument::from_chunk).collect();
        self.lexical_index.add_batch(documents).await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.content().to_string()).collect();
        if !texts.is_empty() {
            let embeddings = self.embedding_service.embed_batch(&texts).await?;
            for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
                self.vector_index.add(chunk.id(), embedding).await?;
            }
        }

        self.lexical_index.save().await?;
        self.vector_index.save().await?;
        Ok(())
    }

    async fn index_one_file(&self, repo_path: &Path, absolute_path: &Path) -> OracleResult<u64> {
        let relative = relative_path(repo_path, absolute_path);
        let language = Language::from_path(absolute_path);

        let content = tokio::fs::read_to_string(absolute_path)
            .await
            .map_err(OracleError::Io)?;

        let chunks = self
            .parser_service
            .parse_file(&content, &relative, language)
            .await?;

        if chunks.is_empty() {
            return Ok(0);
        }

        let persisted = self.chunk_store.insert_batch(chunks).await?;

        let documents: Vec<LexicalDocument> = persisted.iter().map(LexicalDocument::from_chunk).collect();
        self.lexical_index.add_batch(documents).await?;

        let texts: Vec<String> = persisted.iter().map(|c| c.content().to_string()).collect();
        let embeddings = self.embedding_service.embed_batch(&texts).await?;
        for (chunk, embedding) in persisted.iter().zip(embeddings.iter()) {
            self.vector_index.add(chunk.id(), embedding).await?;
        }

        debug!(file = %relative, chunks = persisted.len(), "indexed file");
        Ok(persisted.len() as u64)
    }

    fn discover_files(&self, repo_path: &Path) -> Vec<std::path::PathBuf> {
        self.walker
            .discover(repo_path)
            .into_iter()
            .filter(|path| self.parser_service.supports_language(Language::from_path(path)))
            .collect()
    }
}

fn relative_path(repo_path: &Path, absolute: &Path) -> String {
    absolute
        .strip_prefix(repo_path)
        .unwrap_or(absolute)
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_strips_the_repo_prefix() {
        let repo = Path::new("/repo");
        let file = Path::new("/repo/src/main.rs");
        assert_eq!(relative_path(repo, file), "src/main.rs");
    }
}
