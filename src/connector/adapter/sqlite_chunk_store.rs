use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::application::ChunkStore;
use crate::domain::models::SymbolType;
use crate::domain::{Chunk, Language, OracleError, OracleResult};

/// Number of rows an `insert_batch` call may write before it forces a WAL
/// checkpoint, bounding on-disk log growth (spec §4.4).
const CHECKPOINT_THRESHOLD: usize = 1000;
const SCHEMA_VERSION: i64 = 1;

/// SQLite-backed Chunk Store (spec §4.4): single writer, WAL mode, a
/// `schema_migrations` audit trail alongside `PRAGMA user_version`. Chosen
/// over the teacher's DuckDB metadata store because SQLite exposes the
/// WAL/user-version primitives the spec names directly; see DESIGN.md.
pub struct SqliteChunkStore {
    conn: Mutex<Connection>,
}

impl SqliteChunkStore {
    pub fn open(path: impl AsRef<Path>) -> OracleResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| OracleError::internal(format!("failed to open chunk store: {e}")))?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> OracleResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| OracleError::internal(format!("failed to open in-memory chunk store: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> OracleResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| OracleError::internal(format!("failed to enable WAL mode: {e}")))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| OracleError::internal(format!("failed to enable foreign keys: {e}")))?;

        let store = Self { conn: Mutex::new(conn) };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> OracleResult<()> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            );",
        )
        .map_err(|e| OracleError::internal(format!("failed to create migrations table: {e}")))?;

        let current: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| OracleError::internal(format!("failed to read user_version: {e}")))?;

        if current >= SCHEMA_VERSION {
            return Ok(());
        }

        info!(from = current, to = SCHEMA_VERSION, "running chunk store migrations");

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| OracleError::internal(format!("failed to start migration transaction: {e}")))?;

        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_path TEXT NOT NULL,
                symbol_name TEXT,
                symbol_type TEXT NOT NULL,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                file_hash TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                language TEXT NOT NULL,
                indexed_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_file_path ON chunks(file_path);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_chunks_lexical_id ON chunks(file_path, start_line);",
        )
        .map_err(|e| OracleError::internal(format!("migration 1 failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, strftime('%s','now'))",
            params![SCHEMA_VERSION, "create chunks table"],
        )
        .map_err(|e| OracleError::internal(format!("failed to record migration: {e}")))?;

        tx.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| OracleError::internal(format!("failed to set user_version: {e}")))?;

        tx.commit()
            .map_err(|e| OracleError::internal(format!("failed to commit migration: {e}")))?;

        Ok(())
    }

    fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<Chunk> {
        let id: i64 = row.get("id")?;
        let file_path: String = row.get("file_path")?;
        let symbol_name: Option<String> = row.get("symbol_name")?;
        let symbol_type: String = row.get("symbol_type")?;
        let content: String = row.get("content")?;
        let content_hash: String = row.get("content_hash")?;
        let file_hash: String = row.get("file_hash")?;
        let start_line: u32 = row.get("start_line")?;
        let end_line: u32 = row.get("end_line")?;
        let language: String = row.get("language")?;
        let indexed_at: i64 = row.get("indexed_at")?;

        Ok(Chunk::reconstitute(
            id,
            file_path,
            symbol_name,
            SymbolType::parse(&symbol_type),
            content,
            content_hash,
            file_hash,
            start_line,
            end_line,
            Language::parse(&language),
            indexed_at,
        ))
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn insert_batch(&self, chunks: Vec<Chunk>) -> OracleResult<Vec<Chunk>> {
        if chunks.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;
        let tx = conn
            .transaction()
            .map_err(|e| OracleError::internal(format!("failed to start transaction: {e}")))?;

        let mut inserted = Vec::with_capacity(chunks.len());
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO chunks
                        (file_path, symbol_name, symbol_type, content, content_hash, file_hash, start_line, end_line, language, indexed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, strftime('%s','now'))",
                )
                .map_err(|e| OracleError::internal(format!("failed to prepare insert: {e}")))?;

            for chunk in chunks {
                stmt.execute(params![
                    chunk.file_path(),
                    chunk.symbol_name(),
                    chunk.symbol_type().as_str(),
                    chunk.content(),
                    chunk.content_hash(),
                    chunk.file_hash(),
                    chunk.start_line(),
                    chunk.end_line(),
                    chunk.language().as_str(),
                ])
                .map_err(|e| OracleError::internal(format!("failed to insert chunk: {e}")))?;

                let id = tx.last_insert_rowid();
                inserted.push(chunk.with_id(id));
            }
        }

        tx.commit()
            .map_err(|e| OracleError::internal(format!("failed to commit insert batch: {e}")))?;

        debug!(count = inserted.len(), "inserted chunk batch");

        if inserted.len() >= CHECKPOINT_THRESHOLD {
            conn.pragma_update(None, "wal_checkpoint", "TRUNCATE")
                .map_err(|e| OracleError::internal(format!("failed to checkpoint WAL: {e}")))?;
        }

        Ok(inserted)
    }

    async fn delete_by_file_path(&self, file_path: &str) -> OracleResult<Vec<i64>> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        let mut stmt = conn
            .prepare("SELECT id FROM chunks WHERE file_path = ?1")
            .map_err(|e| OracleError::internal(format!("failed to prepare select: {e}")))?;
        let ids: Vec<i64> = stmt
            .query_map(params![file_path], |row| row.get(0))
            .map_err(|e| OracleError::internal(format!("failed to query chunk ids: {e}")))?
            .collect::<Result<_, _>>()
            .map_err(|e| OracleError::internal(format!("failed to collect chunk ids: {e}")))?;

        conn.execute("DELETE FROM chunks WHERE file_path = ?1", params![file_path])
            .map_err(|e| OracleError::internal(format!("failed to delete chunks: {e}")))?;

        Ok(ids)
    }

    async fn delete_all(&self) -> OracleResult<()> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;
        conn.execute("DELETE FROM chunks", [])
            .map_err(|e| OracleError::internal(format!("failed to delete all chunks: {e}")))?;
        Ok(())
    }

    async fn list_by_file(&self, file_path: &str) -> OracleResult<Vec<Chunk>> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        let mut stmt = conn
            .prepare("SELECT * FROM chunks WHERE file_path = ?1 ORDER BY id")
            .map_err(|e| OracleError::internal(format!("failed to prepare list_by_file: {e}")))?;

        let chunks = stmt
            .query_map(params![file_path], Self::row_to_chunk)
            .map_err(|e| OracleError::internal(format!("failed to query chunks by file: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OracleError::internal(format!("failed to collect chunks by file: {e}")))?;

        Ok(chunks)
    }

    async fn get_by_hash(&self, hash: &str) -> OracleResult<Option<Chunk>> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        conn.query_row(
            "SELECT * FROM chunks WHERE content_hash = ?1 LIMIT 1",
            params![hash],
            Self::row_to_chunk,
        )
        .optional()
        .map_err(|e| OracleError::internal(format!("failed to query chunk by hash: {e}")))
    }

    async fn list_file_paths(&self) -> OracleResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT file_path FROM chunks ORDER BY file_path")
            .map_err(|e| OracleError::internal(format!("failed to prepare list_file_paths: {e}")))?;

        let paths = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| OracleError::internal(format!("failed to query file paths: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OracleError::internal(format!("failed to collect file paths: {e}")))?;

        Ok(paths)
    }

    async fn file_hashes(&self) -> OracleResult<Vec<(String, String)>> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT file_path, file_hash FROM chunks ORDER BY file_path")
            .map_err(|e| OracleError::internal(format!("failed to prepare file_hashes query: {e}")))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| OracleError::internal(format!("failed to query file hashes: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OracleError::internal(format!("failed to collect file hashes: {e}")))?;

        Ok(rows)
    }

    async fn list_all(&self) -> OracleResult<Vec<Chunk>> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        let mut stmt = conn
            .prepare("SELECT * FROM chunks ORDER BY id")
            .map_err(|e| OracleError::internal(format!("failed to prepare list_all: {e}")))?;

        let chunks = stmt
            .query_map([], Self::row_to_chunk)
            .map_err(|e| OracleError::internal(format!("failed to query all chunks: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OracleError::internal(format!("failed to collect chunks: {e}")))?;

        Ok(chunks)
    }

    async fn get(&self, id: i64) -> OracleResult<Option<Chunk>> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        conn.query_row("SELECT * FROM chunks WHERE id = ?1", params![id], Self::row_to_chunk)
            .optional()
            .map_err(|e| OracleError::internal(format!("failed to query chunk by id: {e}")))
    }

    async fn get_many(&self, ids: &[i64]) -> OracleResult<Vec<Chunk>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        let placeholders = std::iter::repeat_n("?", ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!("SELECT * FROM chunks WHERE id IN ({placeholders})");

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| OracleError::internal(format!("failed to prepare get_many: {e}")))?;

        let params = rusqlite::params_from_iter(ids.iter());
        let chunks = stmt
            .query_map(params, Self::row_to_chunk)
            .map_err(|e| OracleError::internal(format!("failed to query chunks by id: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OracleError::internal(format!("failed to collect chunks by id: {e}")))?;

        Ok(chunks)
    }

    async fn get_by_lexical_id(&self, lexical_id: &str) -> OracleResult<Option<Chunk>> {
        let (file_path, start_line) = lexical_id
            .rsplit_once(':')
            .ok_or_else(|| OracleError::invalid_input(format!("malformed lexical id: {lexical_id}")))?;
        let start_line: u32 = start_line
            .parse()
            .map_err(|_| OracleError::invalid_input(format!("malformed lexical id: {lexical_id}")))?;

        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;

        conn.query_row(
            "SELECT * FROM chunks WHERE file_path = ?1 AND start_line = ?2",
            params![file_path, start_line],
            Self::row_to_chunk,
        )
        .optional()
        .map_err(|e| OracleError::internal(format!("failed to query chunk by lexical id: {e}")))
    }

    async fn count(&self) -> OracleResult<u64> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| OracleError::internal(format!("failed to count chunks: {e}")))?;
        Ok(count as u64)
    }

    async fn schema_version(&self) -> OracleResult<i64> {
        let conn = self.conn.lock().map_err(|_| OracleError::internal("chunk store lock poisoned"))?;
        conn.query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| OracleError::internal(format!("failed to read user_version: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk(file_path: &str, start_line: u32) -> Chunk {
        Chunk::new(file_path, "fn f() {}", start_line, start_line, Language::Rust, SymbolType::Function)
            .with_symbol_name("f")
    }

    #[tokio::test]
    async fn migrations_set_user_version() {
        let store = SqliteChunkStore::in_memory().unwrap();
        assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn insert_batch_assigns_ids_and_round_trips() {
        let store = SqliteChunkStore::in_memory().unwrap();
        let inserted = store.insert_batch(vec![sample_chunk("a.rs", 1)]).await.unwrap();
        assert_eq!(inserted.len(), 1);
        assert!(inserted[0].id() > 0);

        let fetched = store.get(inserted[0].id()).await.unwrap().unwrap();
        assert_eq!(fetched.file_path(), "a.rs");
        assert_eq!(fetched.symbol_name(), Some("f"));
    }

    #[tokio::test]
    async fn get_by_lexical_id_matches_file_path_and_start_line() {
        let store = SqliteChunkStore::in_memory().unwrap();
        let inserted = store.insert_batch(vec![sample_chunk("a.rs", 5)]).await.unwrap();
        let lexical_id = inserted[0].lexical_id();

        let fetched = store.get_by_lexical_id(&lexical_id).await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().id(), inserted[0].id());
    }

    #[tokio::test]
    async fn delete_by_file_path_removes_only_that_files_chunks() {
        let store = SqliteChunkStore::in_memory().unwrap();
        store.insert_batch(vec![sample_chunk("a.rs", 1), sample_chunk("b.rs", 1)]).await.unwrap();

        let deleted = store.delete_by_file_path("a.rs").await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn file_hashes_returns_one_row_per_distinct_file() {
        let store = SqliteChunkStore::in_memory().unwrap();
        store
            .insert_batch(vec![sample_chunk("a.rs", 1), sample_chunk("a.rs", 10)])
            .await
            .unwrap();

        let hashes = store.file_hashes().await.unwrap();
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes[0].0, "a.rs");
    }

    #[tokio::test]
    async fn delete_all_clears_every_row() {
        let store = SqliteChunkStore::in_memory().unwrap();
        store.insert_batch(vec![sample_chunk("a.rs", 1), sample_chunk("b.rs", 1)]).await.unwrap();

        store.delete_all().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_by_file_returns_only_that_files_chunks() {
        let store = SqliteChunkStore::in_memory().unwrap();
        store
            .insert_batch(vec![sample_chunk("a.rs", 1), sample_chunk("a.rs", 5), sample_chunk("b.rs", 1)])
            .await
            .unwrap();

        let chunks = store.list_by_file("a.rs").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.file_path() == "a.rs"));
    }

    #[tokio::test]
    async fn get_by_hash_finds_a_matching_chunk() {
        let store = SqliteChunkStore::in_memory().unwrap();
        let inserted = store.insert_batch(vec![sample_chunk("a.rs", 1)]).await.unwrap();

        let found = store.get_by_hash(inserted[0].content_hash()).await.unwrap();
        assert_eq!(found.unwrap().id(), inserted[0].id());

        let missing = store.get_by_hash("not-a-real-hash").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn list_file_paths_is_distinct_and_ascending() {
        let store = SqliteChunkStore::in_memory().unwrap();
        store
            .insert_batch(vec![sample_chunk("b.rs", 1), sample_chunk("a.rs", 1), sample_chunk("a.rs", 5)])
            .await
            .unwrap();

        let paths = store.list_file_paths().await.unwrap();
        assert_eq!(paths, vec!["a.rs".to_string(), "b.rs".to_string()]);
    }

    #[tokio::test]
    async fn get_many_returns_matching_rows_and_skips_missing_ids() {
        let store = SqliteChunkStore::in_memory().unwrap();
        let inserted = store
            .insert_batch(vec![sample_chunk("a.rs", 1), sample_chunk("b.rs", 1)])
            .await
            .unwrap();
        let ids = [inserted[0].id(), inserted[1].id(), 999_999];

        let chunks = store.get_many(&ids).await.unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[tokio::test]
    async fn get_many_with_no_ids_returns_empty() {
        let store = SqliteChunkStore::in_memory().unwrap();
        assert!(store.get_many(&[]).await.unwrap().is_empty());
    }
}
