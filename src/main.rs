//! RAG Indexing Service - Main Entry Point
//!
//! Chunks, vectorizes and indexes documents, and answers retrieval queries.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ragindex::api::{self, AppState};
use ragindex::jobs::{JobProcessor, JobStore};
use ragindex::pipeline::Pipeline;
use ragindex::storage::{FsBlobStore, MemoryVectorStore};
use ragindex::types::ServiceConfig;
use ragindex::vectorize::build_vectorizer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ragindex=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = ServiceConfig::from_env();

    info!("Starting RAG Indexing Service v{}", env!("CARGO_PKG_VERSION"));
    info!(
        data_dir = %config.data_dir.display(),
        vectorizer = %config.vectorizer,
        chunking = %config.chunking_strategy,
        vector_dim = config.vector_dim,
        "Loaded configuration"
    );

    // Initialize components
    let vectorizer = build_vectorizer(&config)?;
    let pipeline = Arc::new(Pipeline::new(
        &config,
        Arc::new(FsBlobStore::new(&config.data_dir)),
        Arc::new(MemoryVectorStore::new()),
        vectorizer,
    ));
    let jobs = JobProcessor::new(pipeline.clone(), Arc::new(RwLock::new(JobStore::new())));

    let state = Arc::new(AppState { pipeline, jobs });

    // Build HTTP routes
    let app = api::routes(state)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
