//! In-memory content store using cosine similarity.
//!
//! Suitable for tests and local development; production deployments use
//! [`QdrantContentStore`](crate::qdrant::QdrantContentStore).

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::{CollectionInfo, ScoredChunk, StoredVector};
use crate::error::Result;
use crate::store::ContentStore;

/// An in-memory [`ContentStore`] backed by a `HashMap` behind an async
/// `RwLock`. The lock guards only synchronous map access; no await happens
/// while it is held.
#[derive(Debug)]
pub struct InMemoryContentStore {
    collection_name: String,
    points: RwLock<HashMap<Uuid, StoredVector>>,
}

impl InMemoryContentStore {
    /// Create an empty store for the named collection.
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self { collection_name: collection_name.into(), points: RwLock::new(HashMap::new()) }
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn ensure_collection(&self, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, vectors: &[StoredVector]) -> Result<()> {
        let mut points = self.points.write().await;
        for vector in vectors {
            points.insert(vector.id, vector.clone());
        }
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let points = self.points.read().await;
        let mut scored: Vec<ScoredChunk> = points
            .values()
            .map(|point| ScoredChunk {
                chunk: point.chunk.clone(),
                score: cosine_similarity(&point.embedding, embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_all(&self) -> Result<()> {
        self.points.write().await.clear();
        Ok(())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        let count = self.points.read().await.len() as u64;
        Ok(CollectionInfo {
            collection_name: self.collection_name.clone(),
            total_documents: count,
            vectors_count: count,
            status: "green".to_string(),
        })
    }

    async fn document_sources(&self) -> Result<Vec<String>> {
        let points = self.points.read().await;
        let sources: BTreeSet<String> = points
            .values()
            .filter_map(|point| point.chunk.metadata.get("source").cloned())
            .collect();
        Ok(sources.into_iter().collect())
    }

    async fn healthy(&self) -> bool {
        true
    }
}
