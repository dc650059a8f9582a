//! Mapping pipeline errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use docqa_rag::RagError;

/// A handler failure carrying the status it maps to.
///
/// Every error body has the same shape: `{"detail": "<reason>"}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, detail: detail.into() }
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::UNPROCESSABLE_ENTITY, detail: detail.into() }
    }
}

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        let status = match &e {
            RagError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RagError::UnsupportedFormat(_) | RagError::Extraction(_) | RagError::Chunking(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, detail: e.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = %self.detail, "request failed");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
