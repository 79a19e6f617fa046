//! # Application Layer
//!
//! Use cases and the port traits (interfaces) they depend on. This layer
//! coordinates the domain and connector layers but has no knowledge of
//! which concrete storage/parsing/embedding engine backs a trait.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
