use serde::{Deserialize, Serialize};

use super::Chunk;

/// A hydrated, scored retrieval result (spec §4.11 step 8): the fields the
/// Retriever returns for each fused, reranked chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    id: i64,
    file_path: String,
    symbol_name: String,
    content: String,
    start_line: u32,
    end_line: u32,
    score: f32,
}

impl RetrievedChunk {
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            id: chunk.id(),
            file_path: chunk.file_path().to_string(),
            symbol_name: chunk.symbol_name().unwrap_or_default().to_string(),
            content: chunk.content().to_string(),
            start_line: chunk.start_line(),
            end_line: chunk.end_line(),
            score,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn symbol_name(&self) -> &str {
        &self.symbol_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    /// Returns a copy with `score` replaced, keeping the hydrated fields
    /// intact. Used by rerankers, which re-score without re-fetching chunks.
    pub fn with_score(&self, score: f32) -> Self {
        Self { score, ..self.clone() }
    }

    pub fn location(&self) -> String {
        format!("{}:{}-{}", self.file_path, self.start_line, self.end_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SymbolType;
    use crate::domain::Language;

    #[test]
    fn hydrates_fields_from_the_source_chunk() {
        let chunk = Chunk::new("a.py", "def f(): pass", 1, 1, Language::Python, SymbolType::Function)
            .with_symbol_name("f")
            .with_id(42);

        let result = RetrievedChunk::from_chunk(&chunk, 0.87);
        assert_eq!(result.id(), 42);
        assert_eq!(result.symbol_name(), "f");
        assert_eq!(result.location(), "a.py:1-1");
        assert_eq!(result.score(), 0.87);
    }

    #[test]
    fn symbol_name_is_empty_string_when_absent() {
        let chunk = Chunk::new("a.py", "x = 1", 1, 1, Language::Python, SymbolType::Unknown);
        let result = RetrievedChunk::from_chunk(&chunk, 0.1);
        assert_eq!(result.symbol_name(), "");
    }
}
