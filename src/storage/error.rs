//! Storage error type.

use super::Container;

/// Errors raised by blob and vector stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{container}/{key} not found")]
    NotFound { container: Container, key: String },

    #[error("invalid blob key `{0}`")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in {container}/{key}: {source}")]
    Json {
        container: Container,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("collection `{0}` does not exist")]
    UnknownCollection(String),

    #[error("collection `{0}` already exists")]
    CollectionExists(String),

    #[error("collection `{collection}` holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("insert got {ids} ids, {vectors} vectors and {sources} sources")]
    LengthMismatch {
        ids: usize,
        vectors: usize,
        sources: usize,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
