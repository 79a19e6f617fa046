use serde::{Deserialize, Serialize};

use crate::domain::hasher::content_hash;

use super::Language;

/// A syntactically-bounded slice of source code extracted from a file's AST
/// (spec §3). `id` and `indexed_at` are assigned by the Chunk Store on
/// insert; chunks fresh out of the Chunker carry placeholder values for
/// both until persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    id: i64,
    file_path: String,
    symbol_name: Option<String>,
    symbol_type: SymbolType,
    content: String,
    content_hash: String,
    file_hash: String,
    start_line: u32,
    end_line: u32,
    language: Language,
    indexed_at: i64,
}

impl Chunk {
    /// Builds a chunk as the Chunker would emit it: unpersisted (`id == 0`,
    /// `indexed_at == 0`), `content_hash` derived from `content`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_path: impl Into<String>,
        content: impl Into<String>,
        start_line: u32,
        end_line: u32,
        language: Language,
        symbol_type: SymbolType,
    ) -> Self {
        let content = content.into();
        let content_hash = content_hash(content.as_bytes());
        // Falls back to the chunk's own hash until `with_file_hash` is
        // called with the whole file's hash (the Chunker does this for
        // every chunk it emits from the same parse).
        let file_hash = content_hash.clone();
        Self {
            id: 0,
            file_path: file_path.into(),
            symbol_name: None,
            symbol_type,
            content,
            content_hash,
            file_hash,
            start_line,
            end_line,
            language,
            indexed_at: 0,
        }
    }

    /// Reconstitutes a chunk from a persisted row (used by Chunk Store
    /// adapters when hydrating query results).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: i64,
        file_path: String,
        symbol_name: Option<String>,
        symbol_type: SymbolType,
        content: String,
        content_hash: String,
        file_hash: String,
        start_line: u32,
        end_line: u32,
        language: Language,
        indexed_at: i64,
    ) -> Self {
        Self {
            id,
            file_path,
            symbol_name,
            symbol_type,
            content,
            content_hash,
            file_hash,
            start_line,
            end_line,
            language,
            indexed_at,
        }
    }

    pub fn with_symbol_name(mut self, name: impl Into<String>) -> Self {
        self.symbol_name = Some(name.into());
        self
    }

    /// Sets the content hash of the whole file this chunk was extracted
    /// from (spec §4.10's incremental diff key), distinct from this
    /// chunk's own `content_hash`.
    pub fn with_file_hash(mut self, file_hash: impl Into<String>) -> Self {
        self.file_hash = file_hash.into();
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_indexed_at(mut self, indexed_at: i64) -> Self {
        self.indexed_at = indexed_at;
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn symbol_name(&self) -> Option<&str> {
        self.symbol_name.as_deref()
    }

    pub fn symbol_type(&self) -> SymbolType {
        self.symbol_type
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn file_hash(&self) -> &str {
        &self.file_hash
    }

    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn indexed_at(&self) -> i64 {
        self.indexed_at
    }

    /// The Lexical Index's key for this chunk (spec §4.5).
    pub fn lexical_id(&self) -> String {
        format!("{}:{}", self.file_path, self.start_line)
    }

    /// Re-derives `content_hash` from `content` and compares; used by tests
    /// and by the Chunker's own invariant checks.
    pub fn hash_matches_content(&self) -> bool {
        content_hash(self.content.as_bytes()) == self.content_hash
    }
}

/// The kind of AST construct a [`Chunk`] was extracted from (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    Function,
    Class,
    Method,
    Unknown,
}

impl SymbolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::Function => "function",
            SymbolType::Class => "class",
            SymbolType::Method => "method",
            SymbolType::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "function" => SymbolType::Function,
            "class" => SymbolType::Class,
            "method" => SymbolType::Method,
            _ => SymbolType::Unknown,
        }
    }
}

impl std::fmt::Display for SymbolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_pure_function_of_content() {
        let chunk = Chunk::new(
            "src/lib.rs",
            "fn add(a: i32, b: i32) -> i32 { a + b }",
            10,
            12,
            Language::Rust,
            SymbolType::Function,
        )
        .with_symbol_name("add");

        assert!(chunk.hash_matches_content());
        assert_eq!(chunk.content_hash().len(), 64);
    }

    #[test]
    fn lexical_id_is_file_path_colon_start_line() {
        let chunk = Chunk::new("a.ts", "export function f() {}", 3, 3, Language::TypeScript, SymbolType::Function);
        assert_eq!(chunk.lexical_id(), "a.ts:3");
    }

    #[test]
    fn symbol_type_round_trips_through_str() {
        for st in [
            SymbolType::Function,
            SymbolType::Class,
            SymbolType::Method,
            SymbolType::Unknown,
        ] {
            assert_eq!(SymbolType::parse(st.as_str()), st);
        }
    }
}
