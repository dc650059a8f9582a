//! Question answering endpoints: complete, streamed, and retrieval-only.

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::{error, info};

use docqa_rag::{AnswerEnvelope, SourceChunk};

use crate::error::ApiError;
use crate::state::AppState;

fn default_include_sources() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default = "default_include_sources")]
    pub include_sources: bool,
    #[serde(default)]
    pub enable_evaluation: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub content: String,
    pub metadata: std::collections::HashMap<String, String>,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub count: usize,
}

/// POST /query
pub async fn answer(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<AnswerEnvelope>, ApiError> {
    info!(question_chars = request.question.chars().count(), "query received");
    let envelope = state
        .query
        .answer(&request.question, request.include_sources, request.enable_evaluation)
        .await?;
    Ok(Json(envelope))
}

/// POST /query/stream
///
/// Fragments are forwarded as `chunk` events in emission order, followed by
/// a terminal `end` event. A mid-stream failure is reported as a trailing
/// `error` event; the fragments already sent stand, nothing is silently
/// truncated.
pub async fn answer_stream(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    info!(question_chars = request.question.chars().count(), "streaming query received");
    let mut tokens = state.query.answer_stream(&request.question).await?;

    let stream = async_stream::stream! {
        loop {
            match tokens.next().await {
                Some(Ok(fragment)) => {
                    yield Ok(Event::default().event("chunk").data(fragment));
                }
                Some(Err(e)) => {
                    error!(error = %e, "answer stream failed mid-flight");
                    yield Ok(Event::default().event("error").data(e.to_string()));
                    return;
                }
                None => break,
            }
        }
        yield Ok(Event::default().event("end").data(""));
    };
    Ok(Sse::new(stream))
}

/// POST /query/search
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let retrieved = state.query.search(&request.question).await?;
    let results: Vec<SearchResult> = retrieved
        .iter()
        .map(|scored| {
            let source = SourceChunk::from(scored);
            SearchResult { content: source.content, metadata: source.metadata, score: scored.score }
        })
        .collect();
    let count = results.len();
    Ok(Json(SearchResponse { query: request.question, results, count }))
}
