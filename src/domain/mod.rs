//! # Domain Layer
//!
//! Core business models and the pure leaf services (hashing) that the rest
//! of the system depends on. This layer has no dependency on storage,
//! parsing, or embedding crates.

pub mod error;
pub mod hasher;
pub mod models;

pub use error::{OracleError, OracleResult};
pub use hasher::content_hash;
pub use models::*;
