//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Page;
use crate::indexing::DocumentIndexEntry;
use crate::retrieval::QueryResult;

/// Pages of a document to store and chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPagesRequest {
    pub pages: Vec<Page>,
}

/// Result of chunking one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkDocumentResponse {
    pub document_id: String,
    pub strategy: String,
    pub chunks: usize,
}

/// Result of vectorizing one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizeDocumentResponse {
    pub document_id: String,
    pub vectorizer: String,
    pub vectors: usize,
    pub dimension: usize,
}

/// Response when starting a background job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartJobResponse {
    pub job_id: Uuid,

    pub accepted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The active global index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSummaryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub total_vectors: usize,
    pub documents: Vec<DocumentIndexEntry>,
}

/// A retrieval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,

    /// Maximum number of results; the service default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
}

/// Retrieval results in discovery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub collection: String,
    pub results: Vec<QueryResult>,
}
