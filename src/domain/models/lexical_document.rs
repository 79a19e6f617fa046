use serde::{Deserialize, Serialize};

use super::Chunk;

/// The projection of a [`Chunk`] that the Lexical Index stores (spec §3,
/// §4.5). `id_str` is `Chunk::lexical_id` — a string key, since tantivy
/// documents are addressed by field value rather than an integer rowid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalDocument {
    id_str: String,
    file_path: String,
    symbol_name: String,
    content: String,
    start_line: u32,
    end_line: u32,
}

impl LexicalDocument {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            id_str: chunk.lexical_id(),
            file_path: chunk.file_path().to_string(),
            symbol_name: chunk.symbol_name().unwrap_or_default().to_string(),
            content: chunk.content().to_string(),
            start_line: chunk.start_line(),
            end_line: chunk.end_line(),
        }
    }

    pub fn id_str(&self) -> &str {
        &self.id_str
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

    /// The text actually handed to the lexical analyzer: symbol name first
    /// so an exact-name match scores the same field as the body text.
    pub fn searchable_text(&self) -> String {
        if self.symbol_name.is_empty() {
            self.content.clone()
        } else {
            format!("{}\n{}", self.symbol_name, self.content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SymbolType;
    use crate::domain::Language;

    #[test]
    fn id_str_matches_chunk_lexical_id() {
        let chunk = Chunk::new("a.go", "func f() {}", 5, 5, Language::Go, SymbolType::Function)
            .with_symbol_name("f");
        let doc = LexicalDocument::from_chunk(&chunk);
        assert_eq!(doc.id_str(), chunk.lexical_id());
    }

    #[test]
    fn searchable_text_prepends_symbol_name_when_present() {
        let chunk = Chunk::new("a.go", "func f() {}", 5, 5, Language::Go, SymbolType::Function)
            .with_symbol_name("f");
        let doc = LexicalDocument::from_chunk(&chunk);
        assert_eq!(doc.searchable_text(), "f\nfunc f() {}");
    }

    #[test]
    fn searchable_text_is_just_content_when_symbol_name_absent() {
        let chunk = Chunk::new("a.go", "x := 1", 5, 5, Language::Go, SymbolType::Unknown);
        let doc = LexicalDocument::from_chunk(&chunk);
        assert_eq!(doc.searchable_text(), "x := 1");
    }
}
