mod index_repository;
mod rrf_fuse;
mod search_code;

pub use index_repository::*;
pub use rrf_fuse::*;
pub use search_code::*;
