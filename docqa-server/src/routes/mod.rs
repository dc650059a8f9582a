//! Route table for the HTTP API.

pub mod documents;
pub mod health;
pub mod query;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ui;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route("/assets/{*path}", get(ui::asset))
        .route("/query", post(query::answer))
        .route("/query/stream", post(query::answer_stream))
        .route("/query/search", post(query::search))
        .route("/documents/upload", post(documents::upload))
        .route("/documents/info", get(documents::info))
        .route("/documents/list", get(documents::list))
        .route("/documents/collection", delete(documents::delete_collection))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
