//! Base traits shared by all chunkers.

use std::sync::Arc;

use anyhow::Result;

use crate::types::{Chunk, ChunkConfig, Page};

/// The core trait that all chunkers must implement.
///
/// A chunker takes the pages of one document and packs their sentences into
/// chunks that are suitable for embedding and retrieval.
pub trait Chunker: Send + Sync {
    /// Get the name of this chunker.
    fn name(&self) -> &'static str;

    /// Chunk the given pages with the provided configuration.
    ///
    /// # Arguments
    /// * `pages` - The pages of one document, in reading order
    /// * `config` - Token and sentence budgets
    ///
    /// # Returns
    /// The chunks of the document in emission order.
    fn chunk(&self, pages: &[Page], config: &ChunkConfig) -> Result<Vec<Chunk>>;

    /// Get the description of this chunker.
    fn description(&self) -> &'static str {
        "A text chunker"
    }
}

/// Token counter trait for measuring text length.
pub trait TokenCounter: Send + Sync {
    /// Count the number of tokens in the given text.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Default token counter using tiktoken (cl100k_base encoding).
pub struct TiktokenCounter {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenCounter {
    /// Create a new token counter with the cl100k_base encoding.
    pub fn new() -> Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
        })
    }

    /// Create a token counter with a specific encoding.
    pub fn with_encoding(encoding_name: &str) -> Result<Self> {
        let bpe = match encoding_name {
            "cl100k_base" => tiktoken_rs::cl100k_base()?,
            "p50k_base" => tiktoken_rs::p50k_base()?,
            "p50k_edit" => tiktoken_rs::p50k_edit()?,
            "r50k_base" => tiktoken_rs::r50k_base()?,
            other => anyhow::bail!("unknown encoding: {other}"),
        };
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

lazy_static::lazy_static! {
    static ref CL100K: Arc<TiktokenCounter> = Arc::new(
        TiktokenCounter::new().expect("cl100k_base ships with tiktoken-rs")
    );
}

/// The shared cl100k_base counter.
pub fn default_counter() -> Arc<dyn TokenCounter> {
    CL100K.clone()
}

/// Count tokens using the shared cl100k_base counter.
pub fn count_tokens(text: &str) -> usize {
    CL100K.count_tokens(text)
}
