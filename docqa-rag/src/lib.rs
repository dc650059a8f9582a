//! Retrieval-augmented question answering over uploaded documents.
//!
//! This crate contains the two pipelines at the heart of the service and
//! the collaborator seams they are built on:
//!
//! - [`QueryPipeline`] — embed a question, retrieve the nearest chunks,
//!   generate an answer (complete or streamed), optionally score it.
//! - [`IngestionPipeline`] — extract text from an uploaded file, chunk it,
//!   embed each chunk, and upsert into the content store.
//!
//! External services are abstracted as capability traits ([`Embedder`],
//! [`Answerer`], [`Evaluator`], [`ContentStore`]) so deterministic test
//! doubles can stand in for them. Production implementations are provided
//! for OpenAI ([`openai`]) and Qdrant ([`qdrant`]), plus an in-memory store
//! ([`memory`]) for development and tests.

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod evaluate;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod memory;
pub mod openai;
pub mod pipeline;
pub mod qdrant;
pub mod store;

pub use chunking::{Chunker, RecursiveChunker};
pub use config::{MAX_QUESTION_CHARS, Settings};
pub use document::{Chunk, CollectionInfo, Document, ScoredChunk, StoredVector};
pub use embedding::Embedder;
pub use error::{RagError, Result};
pub use evaluate::{Evaluation, Evaluator, QualityScores};
pub use extract::FileKind;
pub use generation::{Answerer, TokenStream};
pub use ingest::{IngestReport, IngestionPipeline};
pub use memory::InMemoryContentStore;
pub use openai::{OpenAiAnswerer, OpenAiEmbedder, OpenAiJudge};
pub use pipeline::{AnswerEnvelope, QueryPipeline, QueryPipelineBuilder, SourceChunk};
pub use qdrant::QdrantContentStore;
pub use store::ContentStore;
