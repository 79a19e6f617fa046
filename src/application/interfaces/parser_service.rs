use async_trait::async_trait;

use crate::domain::{Chunk, Language, OracleResult};

/// Splits source files into syntactically-bounded [`Chunk`]s (spec §4.3).
#[async_trait]
pub trait ParserService: Send + Sync {
    async fn parse_file(
        &self,
        content: &str,
        file_path: &str,
        language: Language,
    ) -> OracleResult<Vec<Chunk>>;

    fn supported_languages(&self) -> Vec<Language>;

    fn supports_language(&self, language: Language) -> bool {
        self.supported_languages().contains(&language)
    }
}
