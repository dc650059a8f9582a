//! Process-wide configuration, read from the environment once at startup.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Maximum accepted question length in characters.
pub const MAX_QUESTION_CHARS: usize = 1000;

/// Immutable runtime settings.
///
/// Built once at startup via [`Settings::from_env`] and shared read-only
/// across all concurrent requests. Collaborator clients are constructed from
/// these values and never re-read the environment afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// OpenAI API key for embeddings, generation, and evaluation.
    pub openai_api_key: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Dimensionality of the embedding model's output vectors.
    pub embedding_dimensions: usize,
    /// Generation model identifier.
    pub llm_model: String,
    /// Generation sampling temperature.
    pub llm_temperature: f32,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Number of nearest neighbors retrieved per question.
    pub retrieval_k: usize,
    /// Whether the evaluation collaborator is constructed at startup.
    pub enable_evaluation: bool,
    /// Independent timeout for a single evaluation call, in seconds.
    pub evaluation_timeout_seconds: f64,
    /// Qdrant collection name.
    pub collection_name: String,
    /// Qdrant gRPC endpoint.
    pub qdrant_url: String,
    /// Optional Qdrant API key.
    pub qdrant_api_key: Option<String>,
    /// HTTP bind host.
    pub api_host: String,
    /// HTTP bind port.
    pub api_port: u16,
    /// Log filter directive (`info`, `docqa_rag=debug`, ...).
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            llm_model: "gpt-4o-mini".to_string(),
            llm_temperature: 0.0,
            chunk_size: 1000,
            chunk_overlap: 200,
            retrieval_k: 4,
            enable_evaluation: false,
            evaluation_timeout_seconds: 30.0,
            collection_name: "documents".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
            log_level: "info".to_string(),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| RagError::Config(format!("invalid value for {key}: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] when `OPENAI_API_KEY` is missing, a
    /// variable fails to parse, or the resulting values are inconsistent
    /// (see [`validate`](Settings::validate)).
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();
        let settings = Settings {
            openai_api_key: env::var("OPENAI_API_KEY")
                .map_err(|_| RagError::Config("OPENAI_API_KEY is not set".to_string()))?,
            embedding_model: env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimensions: parsed("EMBEDDING_DIMENSIONS")?
                .unwrap_or(defaults.embedding_dimensions),
            llm_model: env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_temperature: parsed("LLM_TEMPERATURE")?.unwrap_or(defaults.llm_temperature),
            chunk_size: parsed("CHUNK_SIZE")?.unwrap_or(defaults.chunk_size),
            chunk_overlap: parsed("CHUNK_OVERLAP")?.unwrap_or(defaults.chunk_overlap),
            retrieval_k: parsed("RETRIEVAL_K")?.unwrap_or(defaults.retrieval_k),
            enable_evaluation: parsed("ENABLE_EVALUATION")?.unwrap_or(defaults.enable_evaluation),
            evaluation_timeout_seconds: parsed("EVALUATION_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.evaluation_timeout_seconds),
            collection_name: env::var("COLLECTION_NAME").unwrap_or(defaults.collection_name),
            qdrant_url: env::var("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            qdrant_api_key: env::var("QDRANT_API_KEY").ok().filter(|k| !k.is_empty()),
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: parsed("API_PORT")?.unwrap_or(defaults.api_port),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Validate internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `chunk_overlap >= chunk_size`,
    /// `retrieval_k == 0`, `embedding_dimensions == 0`, or the evaluation
    /// timeout is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.retrieval_k == 0 {
            return Err(RagError::Config("retrieval_k must be greater than zero".to_string()));
        }
        if self.embedding_dimensions == 0 {
            return Err(RagError::Config(
                "embedding_dimensions must be greater than zero".to_string(),
            ));
        }
        if self.evaluation_timeout_seconds <= 0.0 {
            return Err(RagError::Config(
                "evaluation_timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn rejects_overlap_not_below_chunk_size() {
        let settings = Settings { chunk_size: 200, chunk_overlap: 200, ..Settings::default() };
        assert!(matches!(settings.validate(), Err(RagError::Config(_))));
    }

    #[test]
    fn rejects_zero_retrieval_k() {
        let settings = Settings { retrieval_k: 0, ..Settings::default() };
        assert!(matches!(settings.validate(), Err(RagError::Config(_))));
    }

    #[test]
    fn rejects_non_positive_evaluation_timeout() {
        let settings = Settings { evaluation_timeout_seconds: 0.0, ..Settings::default() };
        assert!(matches!(settings.validate(), Err(RagError::Config(_))));
    }
}
