//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur in the ingestion and query pipelines.
#[derive(Debug, Error)]
pub enum RagError {
    /// The request was rejected before any collaborator call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The uploaded file has an extension outside the supported set.
    #[error("Unsupported file format '{0}': expected .pdf, .txt or .csv")]
    UnsupportedFormat(String),

    /// Text could not be extracted from the uploaded file.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The extracted content produced no usable chunks.
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the content store backend.
    #[error("Content store error ({backend}): {message}")]
    Store {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while generating an answer.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while scoring an answer.
    ///
    /// The query pipeline treats this as non-fatal and embeds it in the
    /// response envelope instead of failing the request.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Ingestion failed after some chunks were already committed.
    ///
    /// There is no cross-chunk transaction: chunks upserted before the
    /// failure remain in the store. `committed` reports how many.
    #[error("Ingestion failed after {committed} chunks were committed: {message}")]
    Ingestion {
        /// Number of chunks successfully upserted before the failure.
        committed: usize,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
