//! Document management endpoints: upload, inspect, list, delete.

use axum::Json;
use axum::extract::{Multipart, State};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use docqa_rag::CollectionInfo;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub chunks_created: usize,
    pub document_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<String>,
    pub count: usize,
}

/// POST /documents/upload
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::unprocessable(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::unprocessable("filename is required"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::unprocessable(format!("could not read upload: {e}")))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }
    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::unprocessable("multipart field 'file' is required"))?;

    info!(file = %filename, bytes = bytes.len(), "document upload received");
    let report = state.ingestion.ingest(&bytes, &filename).await?;

    Ok(Json(UploadResponse {
        message: "Document uploaded and processed successfully".to_string(),
        filename,
        chunks_created: report.chunks_created,
        document_ids: report.document_ids.iter().map(|id| id.to_string()).collect(),
    }))
}

/// GET /documents/info
pub async fn info(State(state): State<AppState>) -> Result<Json<CollectionInfo>, ApiError> {
    let info = state.ingestion.info().await?;
    Ok(Json(info))
}

/// GET /documents/list
pub async fn list(State(state): State<AppState>) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = state.ingestion.document_sources().await?;
    let count = documents.len();
    Ok(Json(DocumentListResponse { documents, count }))
}

/// DELETE /documents/collection
pub async fn delete_collection(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    warn!("collection deletion requested");
    state.ingestion.delete_all().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Collection deleted successfully",
    })))
}
