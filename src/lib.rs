//! RAG Indexing Library
//!
//! Splits document pages into overlapping, token-bounded chunks, assigns
//! every chunk vector a contiguous global ID per document, and expands
//! nearest-neighbor hits with their neighboring chunks at query time.

pub mod api;
pub mod chunkers;
pub mod indexing;
pub mod jobs;
pub mod pipeline;
pub mod retrieval;
pub mod router;
pub mod storage;
pub mod types;
pub mod vectorize;

pub use chunkers::{Chunker, SentenceWindowChunker, TokenWindowChunker};
pub use indexing::{build_global_index, GlobalId, GlobalIndex};
pub use pipeline::{Pipeline, PipelineError};
pub use retrieval::{expand_neighbors, ExpandedHit, SearchHit};
pub use router::{ChunkingRouter, ChunkingStrategy};
pub use types::{Chunk, ChunkConfig, ChunkMap, Page, Sentence, ServiceConfig};
pub use vectorize::{pad_vector, OverlengthPolicy, Vectorizer};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::chunkers::{Chunker, SentenceWindowChunker, TokenWindowChunker};
    pub use crate::indexing::*;
    pub use crate::pipeline::{Pipeline, PipelineError};
    pub use crate::retrieval::*;
    pub use crate::router::{ChunkingRouter, ChunkingStrategy};
    pub use crate::storage::{BlobStore, DocumentStore, VectorStore};
    pub use crate::types::*;
    pub use crate::vectorize::{pad_vector, OverlengthPolicy, Vectorizer};
}

/// Tokens of overlap carried into the next chunk
pub const OVERLAP_TOKENS: usize = 40;

/// A chunk is emitted once it holds at least this many tokens
pub const MIN_TOKENS: usize = 166;

/// Sentences that would push a chunk past this many tokens are split
pub const MAX_TOKENS: usize = 256;

/// Characters per token used to size the overlap tail
pub const CHARS_PER_TOKEN: usize = 3;

/// Sentences per chunk for the sentence-window strategy
pub const SENTENCES_PER_CHUNK: usize = 4;

/// Sentences repeated between sentence-window chunks
pub const OVERLAP_SENTENCES: usize = 1;

/// Fixed dimension of stored vectors
pub const DEFAULT_VECTOR_DIM: usize = 3072;

/// Native dimension of the hashing vectorizer
pub const DEFAULT_HASHING_DIM: usize = 1024;

/// Rows per vector store insert call
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 5000;

/// Results per query
pub const DEFAULT_TOP_K: usize = 5;

/// Concurrent vectorize calls per document
pub const DEFAULT_VECTORIZE_CONCURRENCY: usize = 4;

/// Prefix of the alternating vector store collections
pub const DEFAULT_COLLECTION_PREFIX: &str = "chunks";
