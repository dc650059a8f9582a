//! Query pipeline: the request lifecycle from question to answer envelope.
//!
//! [`QueryPipeline`] composes the [`Embedder`], [`ContentStore`],
//! [`Answerer`], and optional [`Evaluator`] collaborators. It owns the
//! validation boundary, the evaluation timeout, and the partial-failure
//! policy: evaluation failures are embedded in the envelope, every other
//! failure aborts the request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::MAX_QUESTION_CHARS;
use crate::document::{Chunk, ScoredChunk};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::evaluate::{Evaluation, Evaluator};
use crate::generation::{Answerer, TokenStream};
use crate::store::ContentStore;

/// A retrieved chunk as exposed in answer sources and search results.
#[derive(Debug, Clone, Serialize)]
pub struct SourceChunk {
    /// The chunk text.
    pub content: String,
    /// The chunk metadata (source, page/row, chunk index).
    pub metadata: HashMap<String, String>,
}

impl From<&ScoredChunk> for SourceChunk {
    fn from(scored: &ScoredChunk) -> Self {
        Self { content: scored.chunk.text.clone(), metadata: scored.chunk.metadata.clone() }
    }
}

/// The structured response for one answered question.
///
/// `sources` is populated iff the caller requested them; `evaluation` is
/// populated iff evaluation was requested and an evaluator is configured
/// (carrying either scores or an embedded error, never failing the answer).
#[derive(Debug, Clone, Serialize)]
pub struct AnswerEnvelope {
    /// The question as asked.
    pub question: String,
    /// The generated answer text.
    pub answer: String,
    /// Retrieved chunks backing the answer, when requested.
    pub sources: Option<Vec<SourceChunk>>,
    /// Quality scores or the evaluation failure, when requested.
    pub evaluation: Option<Evaluation>,
    /// Total wall-clock time for the request.
    pub processing_time_ms: f64,
}

/// Orchestrates embed → retrieve → generate → (optionally) evaluate.
///
/// Holds no mutable state; one instance is shared across all concurrent
/// requests. Construct via [`QueryPipeline::builder()`].
pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ContentStore>,
    answerer: Arc<dyn Answerer>,
    evaluator: Option<Arc<dyn Evaluator>>,
    retrieval_k: usize,
    evaluation_timeout: Duration,
}

impl QueryPipeline {
    /// Create a new [`QueryPipelineBuilder`].
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    /// Reject empty and over-long questions before any collaborator call.
    fn validate(question: &str) -> Result<()> {
        if question.trim().is_empty() {
            return Err(RagError::Validation("question must not be empty".to_string()));
        }
        let chars = question.chars().count();
        if chars > MAX_QUESTION_CHARS {
            return Err(RagError::Validation(format!(
                "question is {chars} characters; the maximum is {MAX_QUESTION_CHARS}"
            )));
        }
        Ok(())
    }

    /// Embed the question and retrieve the top-k nearest chunks.
    async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let embedding = self.embedder.embed(question).await.inspect_err(|e| {
            error!(error = %e, "question embedding failed");
        })?;
        let retrieved = self.store.search(&embedding, self.retrieval_k).await.inspect_err(|e| {
            error!(error = %e, "similarity search failed");
        })?;
        Ok(retrieved)
    }

    /// Answer a question, optionally attaching sources and quality scores.
    ///
    /// Steps are strictly ordered: validate, embed, retrieve, generate,
    /// evaluate (bounded by the configured timeout, failures non-fatal),
    /// assemble the envelope with the total wall-clock time.
    ///
    /// # Errors
    ///
    /// [`RagError::Validation`] for a rejected question (no collaborator is
    /// called); embedding/retrieval/generation failures propagate as their
    /// tagged error kinds.
    pub async fn answer(
        &self,
        question: &str,
        include_sources: bool,
        enable_evaluation: bool,
    ) -> Result<AnswerEnvelope> {
        Self::validate(question)?;
        let started = Instant::now();

        let retrieved = self.retrieve(question).await?;
        let context: Vec<Chunk> = retrieved.iter().map(|s| s.chunk.clone()).collect();

        let answer = self.answerer.complete(question, &context).await.inspect_err(|e| {
            error!(error = %e, "answer generation failed");
        })?;

        let evaluation = if enable_evaluation {
            self.evaluate(question, &answer, &context).await
        } else {
            None
        };

        let sources = include_sources.then(|| retrieved.iter().map(SourceChunk::from).collect());
        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            retrieved = retrieved.len(),
            evaluated = evaluation.is_some(),
            processing_time_ms,
            "answered question"
        );

        Ok(AnswerEnvelope {
            question: question.to_string(),
            answer,
            sources,
            evaluation,
            processing_time_ms,
        })
    }

    /// Run the evaluator under its independent timeout.
    ///
    /// Returns `None` when no evaluator is configured; otherwise always
    /// returns an [`Evaluation`] — scorer failures and timeouts become
    /// [`Evaluation::Failed`], never a request failure.
    async fn evaluate(&self, question: &str, answer: &str, context: &[Chunk]) -> Option<Evaluation> {
        let evaluator = self.evaluator.as_ref()?;
        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.evaluation_timeout, evaluator.evaluate(question, answer, context))
                .await;
        let evaluation_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let evaluation = match outcome {
            Ok(Ok(scores)) => Evaluation::Scored {
                faithfulness: scores.faithfulness,
                answer_relevancy: scores.answer_relevancy,
                evaluation_time_ms,
            },
            Ok(Err(e)) => {
                warn!(error = %e, "evaluation failed; continuing without scores");
                Evaluation::Failed { error: e.to_string(), evaluation_time_ms }
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.evaluation_timeout.as_secs_f64(),
                    "evaluation timed out; continuing without scores"
                );
                Evaluation::Failed {
                    error: format!(
                        "evaluation timed out after {}s",
                        self.evaluation_timeout.as_secs_f64()
                    ),
                    evaluation_time_ms,
                }
            }
        };
        Some(evaluation)
    }

    /// Embed and retrieve only — no generation cost incurred.
    ///
    /// # Errors
    ///
    /// Same validation and retrieval errors as [`answer`](Self::answer).
    pub async fn search(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        Self::validate(question)?;
        let retrieved = self.retrieve(question).await?;
        info!(retrieved = retrieved.len(), "search completed");
        Ok(retrieved)
    }

    /// Answer a question as a lazy fragment stream.
    ///
    /// Embedding and retrieval happen before the stream is returned;
    /// fragments are forwarded in the answerer's emission order without
    /// reordering, batching, or dropping. Dropping the stream cancels
    /// production at the next opportunity.
    ///
    /// # Errors
    ///
    /// Same validation and retrieval errors as [`answer`](Self::answer);
    /// mid-stream generation failures surface as an `Err` item.
    pub async fn answer_stream(&self, question: &str) -> Result<TokenStream> {
        Self::validate(question)?;
        let retrieved = self.retrieve(question).await?;
        let context: Vec<Chunk> = retrieved.into_iter().map(|s| s.chunk).collect();
        self.answerer.stream(question, &context).await
    }
}

/// Builder for constructing a [`QueryPipeline`].
#[derive(Default)]
pub struct QueryPipelineBuilder {
    embedder: Option<Arc<dyn Embedder>>,
    store: Option<Arc<dyn ContentStore>>,
    answerer: Option<Arc<dyn Answerer>>,
    evaluator: Option<Arc<dyn Evaluator>>,
    retrieval_k: usize,
    evaluation_timeout: Duration,
}

impl QueryPipelineBuilder {
    /// Set the embedding collaborator.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the content store collaborator.
    pub fn store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the answer generation collaborator.
    pub fn answerer(mut self, answerer: Arc<dyn Answerer>) -> Self {
        self.answerer = Some(answerer);
        self
    }

    /// Set the optional evaluation collaborator.
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    /// Set the independent evaluation timeout.
    pub fn evaluation_timeout(mut self, timeout: Duration) -> Self {
        self.evaluation_timeout = timeout;
        self
    }

    /// Build the pipeline, validating that required collaborators are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required collaborator is missing or
    /// `retrieval_k` is zero.
    pub fn build(self) -> Result<QueryPipeline> {
        let embedder =
            self.embedder.ok_or_else(|| RagError::Config("embedder is required".to_string()))?;
        let store = self.store.ok_or_else(|| RagError::Config("store is required".to_string()))?;
        let answerer =
            self.answerer.ok_or_else(|| RagError::Config("answerer is required".to_string()))?;
        if self.retrieval_k == 0 {
            return Err(RagError::Config("retrieval_k must be greater than zero".to_string()));
        }
        let evaluation_timeout = if self.evaluation_timeout.is_zero() {
            Duration::from_secs(30)
        } else {
            self.evaluation_timeout
        };

        Ok(QueryPipeline {
            embedder,
            store,
            answerer,
            evaluator: self.evaluator,
            retrieval_k: self.retrieval_k,
            evaluation_timeout,
        })
    }
}
