//! OpenAI-backed collaborators: embedder, answerer, and LLM-judge evaluator.
//!
//! All three wrap one [`async_openai::Client`] each, constructed once at
//! startup and shared across requests.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, error};

use crate::document::Chunk;
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::evaluate::{Evaluator, QualityScores};
use crate::generation::{Answerer, TokenStream};

fn client(api_key: &str) -> Client<OpenAIConfig> {
    Client::with_config(OpenAIConfig::new().with_api_key(api_key))
}

fn generation_err(message: impl std::fmt::Display) -> RagError {
    RagError::Generation { provider: "openai".to_string(), message: message.to_string() }
}

fn embedding_err(message: impl std::fmt::Display) -> RagError {
    RagError::Embedding { provider: "openai".to_string(), message: message.to_string() }
}

// ── Embedder ────────────────────────────────────────────────────────

/// An [`Embedder`] backed by the OpenAI embeddings API.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create an embedder for `model` producing `dimensions`-length vectors.
    pub fn new(api_key: &str, model: impl Into<String>, dimensions: usize) -> Result<Self> {
        if api_key.is_empty() {
            return Err(embedding_err("API key must not be empty"));
        }
        Ok(Self { client: client(api_key), model: model.into(), dimensions })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        embeddings.pop().ok_or_else(|| embedding_err("API returned an empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, batch_size = texts.len(), "embedding batch");

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts.iter().map(|t| t.to_string()).collect::<Vec<_>>())
            .build()
            .map_err(embedding_err)?;

        let response = self.client.embeddings().create(request).await.map_err(|e| {
            error!(model = %self.model, error = %e, "embedding request failed");
            embedding_err(e)
        })?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        if data.len() != texts.len() {
            return Err(embedding_err(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Answerer ────────────────────────────────────────────────────────

const ANSWER_SYSTEM_PROMPT: &str = "You are an assistant answering questions about the user's \
uploaded documents. Answer using only the provided context. If the context is empty or does not \
contain the answer, say that you cannot find relevant information in the documents.";

fn context_block(context: &[Chunk]) -> String {
    if context.is_empty() {
        return "(no context retrieved)".to_string();
    }
    context
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn chat_messages(system: &str, user: String) -> Result<Vec<ChatCompletionRequestMessage>> {
    Ok(vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system)
            .build()
            .map_err(generation_err)?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(user)
            .build()
            .map_err(generation_err)?
            .into(),
    ])
}

/// An [`Answerer`] backed by the OpenAI chat completions API, in both
/// complete and incrementally streamed modes.
pub struct OpenAiAnswerer {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiAnswerer {
    /// Create an answerer for `model` with the given sampling temperature.
    pub fn new(api_key: &str, model: impl Into<String>, temperature: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(generation_err("API key must not be empty"));
        }
        Ok(Self { client: client(api_key), model: model.into(), temperature })
    }

    fn build_request(
        &self,
        question: &str,
        context: &[Chunk],
    ) -> Result<CreateChatCompletionRequest> {
        let user = format!("Context:\n{}\n\nQuestion: {question}", context_block(context));
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages(chat_messages(ANSWER_SYSTEM_PROMPT, user)?)
            .build()
            .map_err(generation_err)
    }
}

#[async_trait]
impl Answerer for OpenAiAnswerer {
    async fn complete(&self, question: &str, context: &[Chunk]) -> Result<String> {
        let request = self.build_request(question, context)?;
        let response = self.client.chat().create(request).await.map_err(|e| {
            error!(model = %self.model, error = %e, "generation request failed");
            generation_err(e)
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| generation_err("API returned no answer content"))
    }

    async fn stream(&self, question: &str, context: &[Chunk]) -> Result<TokenStream> {
        let request = self.build_request(question, context)?;
        let client = self.client.clone();

        let stream = try_stream! {
            let mut inner = client.chat().create_stream(request).await.map_err(generation_err)?;
            while let Some(item) = inner.next().await {
                let chunk = item.map_err(generation_err)?;
                if let Some(fragment) =
                    chunk.choices.first().and_then(|choice| choice.delta.content.clone())
                {
                    if !fragment.is_empty() {
                        yield fragment;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

// ── Evaluator ───────────────────────────────────────────────────────

const JUDGE_SYSTEM_PROMPT: &str = "You are a strict evaluator of retrieval-augmented answers. \
Score the answer on two metrics, each between 0.0 and 1.0: \"faithfulness\" (is every claim in \
the answer supported by the context?) and \"answer_relevancy\" (does the answer address the \
question?). Respond with a JSON object containing exactly those two keys and nothing else.";

#[derive(Deserialize)]
struct JudgeScores {
    faithfulness: f64,
    answer_relevancy: f64,
}

/// An [`Evaluator`] that asks a chat model to score the answer and parses
/// the JSON scores from its reply.
pub struct OpenAiJudge {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiJudge {
    /// Create a judge using `model` at temperature zero.
    pub fn new(api_key: &str, model: impl Into<String>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(RagError::Evaluation("API key must not be empty".to_string()));
        }
        Ok(Self { client: client(api_key), model: model.into() })
    }

    fn parse_scores(reply: &str) -> Result<QualityScores> {
        // Models occasionally wrap the object in a code fence.
        let body = reply.trim().trim_start_matches("```json").trim_matches('`').trim();
        let scores: JudgeScores = serde_json::from_str(body).map_err(|e| {
            RagError::Evaluation(format!("could not parse judge reply as scores: {e}"))
        })?;
        Ok(QualityScores {
            faithfulness: scores.faithfulness.clamp(0.0, 1.0),
            answer_relevancy: scores.answer_relevancy.clamp(0.0, 1.0),
        })
    }
}

#[async_trait]
impl Evaluator for OpenAiJudge {
    async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        context: &[Chunk],
    ) -> Result<QualityScores> {
        let user = format!(
            "Question: {question}\n\nAnswer: {answer}\n\nContext:\n{}",
            context_block(context)
        );
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(0.0)
            .messages(
                chat_messages(JUDGE_SYSTEM_PROMPT, user)
                    .map_err(|e| RagError::Evaluation(e.to_string()))?,
            )
            .build()
            .map_err(|e| RagError::Evaluation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| RagError::Evaluation(e.to_string()))?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::Evaluation("judge returned no content".to_string()))?;

        Self::parse_scores(&reply)
    }
}
