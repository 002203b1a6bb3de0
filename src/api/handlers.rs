//! HTTP request handlers for the indexing service.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::ApiError;
use crate::jobs::JobProcessor;
use crate::pipeline::Pipeline;
use crate::router::ChunkingStrategy;
use crate::types::{
    ChunkDocumentResponse, ChunkMap, IndexSummaryResponse, IngestPagesRequest, JobStatusResponse,
    QueryRequest, QueryResponse, StartJobResponse, VectorizeDocumentResponse,
};

/// Application state shared across handlers.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub jobs: JobProcessor,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    vectorizer: String,
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        vectorizer: state.pipeline.vectorizer_name().to_string(),
    })
}

/// List available chunkers.
#[derive(Debug, Serialize)]
pub struct ChunkerInfo {
    name: String,
    description: String,
    default: bool,
}

pub async fn list_chunkers(State(state): State<Arc<AppState>>) -> Json<Vec<ChunkerInfo>> {
    let router = state.pipeline.router();
    let default = router.default_strategy().to_string();
    let chunkers = router
        .list_chunkers()
        .into_iter()
        .map(|(name, desc)| ChunkerInfo {
            name: name.to_string(),
            description: desc.to_string(),
            default: name == default,
        })
        .collect();

    Json(chunkers)
}

/// Store the pages of a document and chunk them.
pub async fn put_pages(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
    Json(request): Json<IngestPagesRequest>,
) -> Result<Json<ChunkDocumentResponse>, ApiError> {
    info!(document_id = %document_id, pages = request.pages.len(), "Received pages");
    let response = state
        .pipeline
        .ingest_pages(&document_id, &request.pages)
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ChunkParams {
    strategy: Option<ChunkingStrategy>,
}

/// Re-chunk a document, optionally with another strategy.
pub async fn chunk_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
    Query(params): Query<ChunkParams>,
) -> Result<Json<ChunkDocumentResponse>, ApiError> {
    let response = state
        .pipeline
        .chunk_document(&document_id, params.strategy)
        .await?;
    Ok(Json(response))
}

/// Vectorize the chunks of a document.
pub async fn vectorize_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<VectorizeDocumentResponse>, ApiError> {
    let response = state.pipeline.vectorize_document(&document_id).await?;
    Ok(Json(response))
}

/// Get the chunk map of a document.
pub async fn get_chunks(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<ChunkMap>, ApiError> {
    Ok(Json(state.pipeline.get_chunks(&document_id).await?))
}

/// Start an index rebuild in the background.
pub async fn start_rebuild(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<StartJobResponse>), ApiError> {
    let job_id = state.jobs.start_rebuild().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartJobResponse {
            job_id,
            accepted: true,
            message: None,
        }),
    ))
}

/// Get the active global index.
pub async fn get_index(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IndexSummaryResponse>, ApiError> {
    Ok(Json(state.pipeline.index_summary().await?))
}

/// Get job status.
pub async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let store = state.jobs.job_store().read().await;

    match store.get_job_status(job_id) {
        Some(status) => Ok(Json(status)),
        None => Err(ApiError::not_found(format!("job {job_id} not found"))),
    }
}

/// Retrieve chunks for a question.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let response = state
        .pipeline
        .query(&request.question, request.k)
        .await?;
    info!(
        collection = %response.collection,
        results = response.results.len(),
        "Answered query"
    );
    Ok(Json(response))
}
