//! Core types for the indexing service.

mod chunk;
mod config;
mod document;
mod job;
mod requests;

pub use chunk::{chunk_key, parse_chunk_key, Chunk, ChunkMap, ChunkMapError};
pub use config::{ChunkConfig, ServiceConfig};
pub use document::{Page, Sentence};
pub use job::{JobKind, JobStatus, JobStatusResponse};
pub use requests::{
    ChunkDocumentResponse, IndexSummaryResponse, IngestPagesRequest, QueryRequest, QueryResponse,
    StartJobResponse, VectorizeDocumentResponse,
};
