//! Data types for extracted documents, chunks, and retrieval results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of extracted text with its metadata, prior to chunking.
///
/// Extraction produces one `Document` per PDF page or CSV row and a single
/// `Document` for a plain-text file. Metadata always carries a `source`
/// entry; paginated formats add `page`, tabular formats add `row`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The extracted text content.
    pub text: String,
    /// Key-value metadata describing where the text came from.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with a `source` metadata entry.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), source.into());
        Self { text: text.into(), metadata }
    }
}

/// A segment of a [`Document`], the unit of retrieval.
///
/// Chunks are immutable once created. They carry no identity of their own;
/// a fresh [`Uuid`] is assigned when the chunk is inserted into the content
/// store (see [`StoredVector`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// Metadata inherited from the parent document plus a `chunk_index` entry.
    pub metadata: HashMap<String, String>,
}

/// A chunk paired with its embedding and store-assigned identity.
///
/// The `id` is generated at insert time and never reused after deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredVector {
    /// Unique identifier within the collection.
    pub id: Uuid,
    /// Fixed-length embedding for `chunk.text`.
    pub embedding: Vec<f32>,
    /// The chunk payload.
    pub chunk: Chunk,
}

/// A retrieved [`Chunk`] paired with a similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Similarity to the query embedding (higher is more similar).
    pub score: f32,
}

/// A point-in-time snapshot of the content store collection. Never cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionInfo {
    /// The collection name.
    pub collection_name: String,
    /// Number of stored points.
    pub total_documents: u64,
    /// Number of indexed vectors (equals `total_documents` for this system).
    pub vectors_count: u64,
    /// Backend-reported status (`green`, `not_found`, ...).
    pub status: String,
}
