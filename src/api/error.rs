//! Mapping of pipeline errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::pipeline::PipelineError;
use crate::storage::StoreError;
use crate::vectorize::PaddingError;

/// An error response: a status code and a message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

fn status_of(err: &anyhow::Error) -> StatusCode {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        return match e {
            PipelineError::RebuildInProgress => StatusCode::CONFLICT,
            PipelineError::NoActiveCollection => StatusCode::NOT_FOUND,
            PipelineError::Vectorizer { .. } => StatusCode::BAD_GATEWAY,
        };
    }
    if let Some(e) = err.downcast_ref::<StoreError>() {
        return match e {
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
    }
    if err.downcast_ref::<PaddingError>().is_some() {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    StatusCode::INTERNAL_SERVER_ERROR
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let status = status_of(&err);
        if status.is_server_error() {
            error!(error = %format!("{err:#}"), status = %status, "Request failed");
        }
        Self::new(status, format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
