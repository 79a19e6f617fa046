use thiserror::Error;

/// Error taxonomy for the indexing and retrieval engine (see spec §7).
///
/// Adapters convert their underlying crate's error type into one of these
/// variants at the `connector` boundary; application code never matches on
/// a raw `rusqlite`/`tantivy`/tree-sitter error.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupt: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("transient external error: {0}")]
    TransientExternal(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl OracleError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    pub fn transient_external(msg: impl Into<String>) -> Self {
        Self::TransientExternal(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}

pub type OracleResult<T> = Result<T, OracleError>;
