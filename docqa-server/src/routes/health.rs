//! Liveness and readiness endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::debug;

use crate::state::AppState;

/// GET /health — process liveness, no dependencies consulted.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /health/ready — readiness including the content store connection.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let connected = state.store.healthy().await;
    debug!(connected, "readiness probe");
    if !connected {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "qdrant_connected": false,
                "collection_info": Value::Null,
            })),
        );
    }

    let collection_info = match state.store.info().await {
        Ok(info) => serde_json::to_value(info).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    };
    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "qdrant_connected": true,
            "collection_info": collection_info,
        })),
    )
}
