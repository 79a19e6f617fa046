//! # Oracle
//!
//! A hybrid lexical + semantic retrieval engine over a source repository:
//! tree-sitter chunking, a BM25 lexical index, an HNSW dense vector index,
//! reciprocal-rank fusion, and optional cross-encoder reranking.
//!
//! ## Architecture
//!
//! The crate follows a ports-and-adapters layering:
//!
//! - `domain`: core models, the error taxonomy, and pure functions (hashing,
//!   fusion)
//! - `application`: use cases (`index_repository`, `search_code`) and the
//!   port traits (`interfaces`) those use cases depend on
//! - `connector`: concrete adapters implementing the port traits (SQLite,
//!   tantivy, usearch, tree-sitter, ONNX Runtime, the repository walker)

pub mod application;
pub mod config;
pub mod connector;
pub mod domain;

pub use application::*;
pub use config::*;
pub use connector::*;
pub use domain::*;
