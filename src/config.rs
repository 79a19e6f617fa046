//! Indexing and retrieval options (spec §9's "configurable" knobs), loaded
//! from `.oracle/config.toml` with struct defaults when the file is absent
//! — the same "missing is not fatal" posture the Repository Walker applies
//! to a missing `.gitignore`.

use std::path::Path;

use serde::Deserialize;

use crate::domain::OracleResult;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub walker: WalkerConfig,
    pub search: SearchConfig,
    pub vector_index: VectorIndexConfig,
    pub embedding_model: String,
    pub reranking_model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            walker: WalkerConfig::default(),
            search: SearchConfig::default(),
            vector_index: VectorIndexConfig::default(),
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            reranking_model: None,
        }
    }
}

/// Repository Walker options (spec §4.2).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    pub max_bytes: u64,
    pub extra_ignore_dirs: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_bytes: 500 * 1024,
            extra_ignore_dirs: Vec::new(),
        }
    }
}

/// Retriever options (spec §4.11).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub bm25_limit: usize,
    pub vector_limit: usize,
    pub fusion_limit: usize,
    pub rrf_k: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bm25_limit: 200,
            vector_limit: 100,
            fusion_limit: 30,
            rrf_k: 60.0,
        }
    }
}

impl From<SearchConfig> for crate::application::SearchParams {
    fn from(config: SearchConfig) -> Self {
        Self {
            bm25_limit: config.bm25_limit,
            vector_limit: config.vector_limit,
            fusion_limit: config.fusion_limit,
            rrf_k: config.rrf_k,
        }
    }
}

/// HNSW construction parameters (spec §4.7), mirrored from
/// `usearch::IndexOptions`'s own field names.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    pub dimensions: usize,
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            dimensions: 384,
            connectivity: 16,
            expansion_add: 128,
            expansion_search: 64,
        }
    }
}

impl Config {
    /// Loads `.oracle/config.toml` under `repo_path` if present, falling
    /// back to defaults otherwise.
    pub fn load(repo_path: &Path) -> OracleResult<Self> {
        let config_path = repo_path.join(".oracle").join("config.toml");
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| crate::domain::OracleError::invalid_input(format!("invalid config.toml: {e}")))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::default();
        assert_eq!(config.walker.max_bytes, 500 * 1024);
        assert_eq!(config.search.bm25_limit, 200);
        assert_eq!(config.search.rrf_k, 60.0);
        assert_eq!(config.vector_index.dimensions, 384);
    }

    #[test]
    fn load_falls_back_to_defaults_when_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.search.fusion_limit, 30);
    }

    #[test]
    fn load_reads_a_partial_toml_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".oracle")).unwrap();
        std::fs::write(
            dir.path().join(".oracle").join("config.toml"),
            "embedding_model = \"custom/model\"\n\n[search]\nfusion_limit = 5\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.embedding_model, "custom/model");
        assert_eq!(config.search.fusion_limit, 5);
        assert_eq!(config.search.bm25_limit, 200);
    }
}
