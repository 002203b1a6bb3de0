//! HTTP API.

mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

pub use error::ApiError;
pub use handlers::AppState;

/// Build the service routes.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/chunkers", get(handlers::list_chunkers))
        // Documents
        .route("/documents/:id/pages", put(handlers::put_pages))
        .route("/documents/:id/chunk", post(handlers::chunk_document))
        .route("/documents/:id/vectorize", post(handlers::vectorize_document))
        .route("/documents/:id/chunks", get(handlers::get_chunks))
        // Index
        .route("/index", get(handlers::get_index))
        .route("/index/rebuild", post(handlers::start_rebuild))
        .route("/jobs/:job_id", get(handlers::get_job_status))
        // Retrieval
        .route("/query", post(handlers::query))
        .with_state(state)
}
