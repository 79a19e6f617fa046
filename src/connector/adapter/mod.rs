mod mock_embedding;
mod ort_embedding;
mod ort_reranking;
mod passthrough_reranking;
mod remote_reranking;
mod repository_walker;
mod sqlite_chunk_store;
mod tantivy_lexical_index;
mod treesitter_parser;
mod usearch_vector_index;

pub use mock_embedding::*;
pub use ort_embedding::*;
pub use ort_reranking::*;
pub use passthrough_reranking::*;
pub use remote_reranking::*;
pub use repository_walker::*;
pub use sqlite_chunk_store::*;
pub use tantivy_lexical_index::*;
pub use treesitter_parser::*;
pub use usearch_vector_index::*;
