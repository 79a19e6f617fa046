use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Schema, TantivyDocument, Value, FAST, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};
use tracing::{debug, info};

use crate::application::{LexicalHit, LexicalIndex};
use crate::domain::{LexicalDocument, OracleError, OracleResult};

/// Writer memory budget, bytes. Matches the corpus's default writer heap.
const WRITER_HEAP_BYTES: usize = 50_000_000;

struct Fields {
    id_str: tantivy::schema::Field,
    file_path: tantivy::schema::Field,
    symbol_name: tantivy::schema::Field,
    content: tantivy::schema::Field,
    start_line: tantivy::schema::Field,
    end_line: tantivy::schema::Field,
}

/// Tantivy-backed Lexical Index (spec §4.5): BM25 over `content`, with
/// `symbol_name` folded into the searchable text by [`LexicalDocument`].
/// `save`/`load` treat the index directory as an opaque unit, matching the
/// corpus's `Index::open_in_dir`/`create_in_dir` split on `meta.json`.
pub struct TantivyLexicalIndex {
    index: Index,
    fields: Fields,
    writer: Mutex<IndexWriter>,
    reader: RwLock<IndexReader>,
    directory: PathBuf,
}

impl TantivyLexicalIndex {
    pub fn open(directory: impl AsRef<Path>) -> OracleResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory).map_err(OracleError::Io)?;

        let schema = Self::build_schema();

        let index = if directory.join("meta.json").exists() {
            info!(?directory, "opening existing lexical index");
            Index::open_in_dir(&directory)
                .map_err(|e| OracleError::corrupt(format!("failed to open lexical index: {e}")))?
        } else {
            info!(?directory, "creating new lexical index");
            Index::create_in_dir(&directory, schema.clone())
                .map_err(|e| OracleError::internal(format!("failed to create lexical index: {e}")))?
        };

        let writer = index
            .writer(WRITER_HEAP_BYTES)
            .map_err(|e| OracleError::internal(format!("failed to create index writer: {e}")))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| OracleError::internal(format!("failed to build index reader: {e}")))?;

        let fields = Self::extract_fields(&index.schema())?;

        Ok(Self {
            index,
            fields,
            writer: Mutex::new(writer),
            reader: RwLock::new(reader),
            directory,
        })
    }

    fn build_schema() -> Schema {
        let mut schema_builder = Schema::builder();
        schema_builder.add_text_field("id_str", STRING | STORED | FAST);
        schema_builder.add_text_field("file_path", TEXT | STORED);
        schema_builder.add_text_field("symbol_name", TEXT | STORED);
        schema_builder.add_text_field("content", TEXT | STORED);
        schema_builder.add_u64_field("start_line", STORED | FAST);
        schema_builder.add_u64_field("end_line", STORED | FAST);
        schema_builder.build()
    }

    fn extract_fields(schema: &Schema) -> OracleResult<Fields> {
        let get = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| OracleError::internal(format!("missing lexical index field {name}: {e}")))
        };
        Ok(Fields {
            id_str: get("id_str")?,
            file_path: get("file_path")?,
            symbol_name: get("symbol_name")?,
            content: get("content")?,
            start_line: get("start_line")?,
            end_line: get("end_line")?,
        })
    }

    fn to_document(&self, document: &LexicalDocument) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.fields.id_str, document.id_str());
        doc.add_text(self.fields.file_path, document.file_path());
        doc.add_text(self.fields.symbol_name, document.symbol_name());
        doc.add_text(self.fields.content, document.searchable_text());
        doc.add_u64(self.fields.start_line, document.start_line() as u64);
        doc.add_u64(self.fields.end_line, document.end_line() as u64);
        doc
    }

    fn hit_from_doc(&self, doc: &TantivyDocument, score: f32) -> Option<LexicalHit> {
        let id_str = doc
            .get_first(self.fields.id_str)
            .and_then(|v| v.as_str())
            .map(str::to_string)?;
        Some(LexicalHit { id_str, score })
    }
}

#[async_trait]
impl LexicalIndex for TantivyLexicalIndex {
    async fn add_batch(&self, documents: Vec<LexicalDocument>) -> OracleResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| OracleError::internal("lexical index writer lock poisoned"))?;

        for document in &documents {
            writer.delete_term(Term::from_field_text(self.fields.id_str, document.id_str()));
            writer
                .add_document(self.to_document(document))
                .map_err(|e| OracleError::internal(format!("failed to add document: {e}")))?;
        }

        writer
            .commit()
            .map_err(|e| OracleError::internal(format!("failed to commit lexical index: {e}")))?;

        debug!(count = documents.len(), "added documents to lexical index");
        Ok(())
    }

    async fn delete(&self, id_str: &str) -> OracleResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| OracleError::internal("lexical index writer lock poisoned"))?;

        writer.delete_term(Term::from_field_text(self.fields.id_str, id_str));
        writer
            .commit()
            .map_err(|e| OracleError::internal(format!("failed to commit deletion: {e}")))?;
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> OracleResult<Vec<LexicalHit>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let reader = self
            .reader
            .read()
            .map_err(|_| OracleError::internal("lexical index reader lock poisoned"))?;
        let searcher = reader.searcher();

        let query_parser = QueryParser::for_index(
            &self.index,
            vec![self.fields.content, self.fields.symbol_name, self.fields.file_path],
        );
        let parsed = query_parser
            .parse_query(query)
            .map_err(|e| OracleError::invalid_input(format!("invalid lexical query: {e}")))?;

        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(limit))
            .map_err(|e| OracleError::internal(format!("lexical search failed: {e}")))?;

        let hits = top_docs
            .into_iter()
            .filter_map(|(score, address)| {
                let doc: TantivyDocument = searcher.doc(address).ok()?;
                self.hit_from_doc(&doc, score)
            })
            .collect();

        Ok(hits)
    }

    async fn clear(&self) -> OracleResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| OracleError::internal("lexical index writer lock poisoned"))?;
        writer
            .delete_all_documents()
            .map_err(|e| OracleError::internal(format!("failed to clear lexical index: {e}")))?;
        writer
            .commit()
            .map_err(|e| OracleError::internal(format!("failed to commit lexical index clear: {e}")))?;
        debug!(directory = %self.directory.display(), "lexical index cleared");
        Ok(())
    }

    async fn save(&self) -> OracleResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| OracleError::internal("lexical index writer lock poisoned"))?;
        writer
            .commit()
            .map_err(|e| OracleError::internal(format!("failed to persist lexical index: {e}")))?;
        debug!(directory = %self.directory.display(), "lexical index persisted");
        Ok(())
    }

    async fn count(&self) -> OracleResult<u64> {
        let reader = self
            .reader
            .read()
            .map_err(|_| OracleError::internal("lexical index reader lock poisoned"))?;
        let searcher = reader.searcher();
        let count = searcher
            .segment_readers()
            .iter()
            .map(|r| r.num_docs() as u64)
            .sum();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SymbolType;
    use crate::domain::{Chunk, Language};

    fn doc(file: &str, line: u32, symbol: &str, content: &str) -> LexicalDocument {
        let chunk = Chunk::new(file, content, line, line, Language::Rust, SymbolType::Function)
            .with_symbol_name(symbol);
        LexicalDocument::from_chunk(&chunk)
    }

    #[tokio::test]
    async fn finds_a_document_by_body_term() {
        let dir = tempfile::tempdir().unwrap();
        let index = TantivyLexicalIndex::open(dir.path()).unwrap();
        index
            .add_batch(vec![doc("a.rs", 1, "add", "fn add(a: i32, b: i32) -> i32 { a + b }")])
            .await
            .unwrap();

        let hits = index.search("add", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id_str, "a.rs:1");
    }

    #[tokio::test]
    async fn reindexing_the_same_id_str_replaces_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let index = TantivyLexicalIndex::open(dir.path()).unwrap();
        index
            .add_batch(vec![doc("a.rs", 1, "add", "fn add() { 1 }")])
            .await
            .unwrap();
        index
            .add_batch(vec![doc("a.rs", 1, "subtract", "fn subtract() { 2 }")])
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.search("subtract", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let index = TantivyLexicalIndex::open(dir.path()).unwrap();
        index
            .add_batch(vec![doc("a.rs", 1, "add", "fn add() { 1 }")])
            .await
            .unwrap();
        index.delete("a.rs:1").await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_removes_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let index = TantivyLexicalIndex::open(dir.path()).unwrap();
        index
            .add_batch(vec![
                doc("a.rs", 1, "add", "fn add() { 1 }"),
                doc("b.rs", 1, "sub", "fn sub() { 2 }"),
            ])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 2);

        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_with_empty_query_returns_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let index = TantivyLexicalIndex::open(dir.path()).unwrap();
        index
            .add_batch(vec![doc("a.rs", 1, "add", "fn add() { 1 }")])
            .await
            .unwrap();

        assert!(index.search("", 10).await.unwrap().is_empty());
        assert!(index.search("   ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_with_limit_zero_returns_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let index = TantivyLexicalIndex::open(dir.path()).unwrap();
        index
            .add_batch(vec![doc("a.rs", 1, "add", "fn add() { 1 }")])
            .await
            .unwrap();

        assert!(index.search("add", 0).await.unwrap().is_empty());
    }
}
