//! Content store collaborator trait.

use async_trait::async_trait;

use crate::document::{CollectionInfo, ScoredChunk, StoredVector};
use crate::error::Result;

/// The vector similarity-search service holding all chunks' embeddings.
///
/// Implementations manage a single process-wide collection. They are
/// long-lived, internally synchronized, and shared across all concurrent
/// requests; the pipelines never hold a lock across a call into the store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Create the collection if it does not exist yet. Idempotent.
    async fn ensure_collection(&self, dimensions: usize) -> Result<()>;

    /// Insert vectors with their store-assigned identities.
    ///
    /// Identities are generated by the caller at insert time and must be
    /// unique; re-upserting an id overwrites the previous point.
    async fn upsert(&self, vectors: &[StoredVector]) -> Result<()>;

    /// Return the `top_k` chunks nearest to `embedding`, ordered by
    /// descending similarity. Empty result on an empty collection.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;

    /// Irreversibly remove every vector in the collection.
    ///
    /// Intent confirmation is the caller's concern, not the store's.
    async fn delete_all(&self) -> Result<()>;

    /// Point-in-time snapshot of the collection. Must succeed on an empty
    /// or missing collection, reporting zero counts rather than an error.
    async fn info(&self) -> Result<CollectionInfo>;

    /// Unique `source` metadata values across all stored chunks, sorted.
    async fn document_sources(&self) -> Result<Vec<String>>;

    /// Whether the backend is reachable.
    async fn healthy(&self) -> bool;
}
