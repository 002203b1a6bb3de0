//! Configuration types for chunking and the service.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::router::ChunkingStrategy;
use crate::vectorize::{OverlengthPolicy, VectorizerKind};
use crate::{
    CHARS_PER_TOKEN, DEFAULT_COLLECTION_PREFIX, DEFAULT_HASHING_DIM, DEFAULT_INSERT_BATCH_SIZE,
    DEFAULT_TOP_K, DEFAULT_VECTOR_DIM, DEFAULT_VECTORIZE_CONCURRENCY, MAX_TOKENS, MIN_TOKENS,
    OVERLAP_SENTENCES, OVERLAP_TOKENS, SENTENCES_PER_CHUNK,
};

/// Global service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP port
    pub port: u16,

    /// Root directory of the filesystem blob store
    pub data_dir: PathBuf,

    /// Chunking strategy used for ingestion
    pub chunking_strategy: ChunkingStrategy,

    /// Embedding backend
    pub vectorizer: VectorizerKind,

    /// URL of the embedding service (for the `service` backend)
    pub embedding_service_url: Option<String>,

    /// API key for the `openai` backend
    pub openai_api_key: Option<String>,

    /// Model for the `openai` backend
    pub openai_embedding_model: String,

    /// Native dimension of the `hashing` backend
    pub hashing_dim: usize,

    /// Fixed dimension of stored vectors
    pub vector_dim: usize,

    /// What to do with vectors longer than `vector_dim`
    pub overlength_policy: OverlengthPolicy,

    /// Rows per vector store insert call
    pub insert_batch_size: usize,

    /// Prefix of the two alternating vector store collections
    pub collection_prefix: String,

    /// Default number of results per query
    pub default_top_k: usize,

    /// Concurrent vectorize calls per document
    pub vectorize_concurrency: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 3017,
            data_dir: PathBuf::from("./data"),
            chunking_strategy: ChunkingStrategy::TokenWindow,
            vectorizer: VectorizerKind::Hashing,
            embedding_service_url: None,
            openai_api_key: None,
            openai_embedding_model: "text-embedding-3-large".to_string(),
            hashing_dim: DEFAULT_HASHING_DIM,
            vector_dim: DEFAULT_VECTOR_DIM,
            overlength_policy: OverlengthPolicy::default(),
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
            collection_prefix: DEFAULT_COLLECTION_PREFIX.to_string(),
            default_top_k: DEFAULT_TOP_K,
            vectorize_concurrency: DEFAULT_VECTORIZE_CONCURRENCY,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_or("PORT", defaults.port),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            chunking_strategy: env_or("CHUNKING_STRATEGY", defaults.chunking_strategy),
            vectorizer: env_or("VECTORIZER", defaults.vectorizer),
            embedding_service_url: std::env::var("EMBEDDING_SERVICE_URL").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_embedding_model: std::env::var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or(defaults.openai_embedding_model),
            hashing_dim: env_or("HASHING_DIM", defaults.hashing_dim),
            vector_dim: env_or("VECTOR_DIM", defaults.vector_dim),
            overlength_policy: env_or("OVERLENGTH_POLICY", defaults.overlength_policy),
            insert_batch_size: env_or("INSERT_BATCH_SIZE", defaults.insert_batch_size).max(1),
            collection_prefix: std::env::var("COLLECTION_PREFIX")
                .unwrap_or(defaults.collection_prefix),
            default_top_k: env_or("DEFAULT_TOP_K", defaults.default_top_k),
            vectorize_concurrency: env_or("VECTORIZE_CONCURRENCY", defaults.vectorize_concurrency)
                .max(1),
        }
    }
}

/// Budgets for a single chunking run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Lowest accumulated token count at which a chunk is emitted
    pub min_tokens: usize,

    /// Highest accumulated token count a chunk may reach
    pub max_tokens: usize,

    /// Overlap carried into the next chunk, in tokens
    pub overlap_tokens: usize,

    /// Characters assumed per token when sizing the overlap tail
    pub chars_per_token: usize,

    /// Sentences per chunk (sentence-window strategy)
    pub sentences_per_chunk: usize,

    /// Sentences shared between neighbouring chunks (sentence-window strategy)
    pub overlap_sentences: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_tokens: MIN_TOKENS,
            max_tokens: MAX_TOKENS,
            overlap_tokens: OVERLAP_TOKENS,
            chars_per_token: CHARS_PER_TOKEN,
            sentences_per_chunk: SENTENCES_PER_CHUNK,
            overlap_sentences: OVERLAP_SENTENCES,
        }
    }
}

impl ChunkConfig {
    /// Create a config with the given token window.
    pub fn with_window(min_tokens: usize, max_tokens: usize) -> Self {
        Self {
            min_tokens,
            max_tokens,
            ..Default::default()
        }
    }

    /// Set the overlap.
    pub fn with_overlap(mut self, overlap_tokens: usize) -> Self {
        self.overlap_tokens = overlap_tokens;
        self
    }

    /// Set the sentence window.
    pub fn with_sentences(mut self, per_chunk: usize, overlap: usize) -> Self {
        self.sentences_per_chunk = per_chunk;
        self.overlap_sentences = overlap;
        self
    }

    /// Length of the overlap tail in characters.
    pub fn overlap_chars(&self) -> usize {
        self.overlap_tokens * self.chars_per_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window() {
        let config = ChunkConfig::default();
        assert_eq!(config.min_tokens, 166);
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.overlap_chars(), 120);
    }

    #[test]
    fn test_service_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 3017);
        assert_eq!(config.vector_dim, 3072);
        assert_eq!(config.insert_batch_size, 5000);
        assert_eq!(config.overlength_policy, OverlengthPolicy::PassThrough);
        assert_eq!(config.chunking_strategy, ChunkingStrategy::TokenWindow);
    }
}
