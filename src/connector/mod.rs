//! # Connector Layer
//!
//! Concrete adapters implementing the application layer's port traits:
//! tree-sitter chunking, SQLite chunk storage, tantivy lexical search,
//! usearch vector search, ONNX embedding/reranking, and gitignore-aware
//! repository walking.

pub mod adapter;

pub use adapter::*;
