//! Shared application state handed to every handler.

use std::sync::Arc;

use docqa_rag::{ContentStore, IngestionPipeline, QueryPipeline};

/// Everything the handlers need, constructed once at startup.
///
/// All fields are `Arc`-shared; cloning the state per request is cheap and
/// handlers never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub query: Arc<QueryPipeline>,
    pub ingestion: Arc<IngestionPipeline>,
    pub store: Arc<dyn ContentStore>,
}

impl AppState {
    pub fn new(
        query: Arc<QueryPipeline>,
        ingestion: Arc<IngestionPipeline>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self { query, ingestion, store }
    }
}
