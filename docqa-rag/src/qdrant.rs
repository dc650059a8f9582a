//! Qdrant-backed content store over gRPC.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CollectionStatus, CreateCollectionBuilder, Distance, PointStruct, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info, warn};

use crate::document::{Chunk, CollectionInfo, ScoredChunk, StoredVector};
use crate::error::{RagError, Result};
use crate::store::ContentStore;

/// Scroll page size when listing stored sources.
const SCROLL_LIMIT: u32 = 10_000;

/// A [`ContentStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// One instance manages one named collection with cosine distance. Chunk
/// text and metadata are stored as point payload; point ids are the UUIDs
/// assigned by the ingestion pipeline at insert time.
pub struct QdrantContentStore {
    client: Qdrant,
    collection_name: String,
}

impl QdrantContentStore {
    /// Connect to Qdrant at `url`, optionally authenticating with `api_key`.
    pub fn connect(
        url: &str,
        api_key: Option<String>,
        collection_name: impl Into<String>,
    ) -> Result<Self> {
        let client = Qdrant::from_url(url).api_key(api_key).build().map_err(Self::map_err)?;
        info!(url, "connected qdrant client");
        Ok(Self { client, collection_name: collection_name.into() })
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::Store { backend: "qdrant".to_string(), message: e.to_string() }
    }

    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn payload_to_chunk(payload: &HashMap<String, QdrantValue>) -> Chunk {
        let text = payload.get("text").and_then(Self::extract_string).unwrap_or_default();
        let metadata: HashMap<String, String> = payload
            .get("metadata")
            .and_then(|value| match &value.kind {
                Some(Kind::StructValue(fields)) => Some(
                    fields
                        .fields
                        .iter()
                        .filter_map(|(k, v)| Self::extract_string(v).map(|s| (k.clone(), s)))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();
        Chunk { text, metadata }
    }

    fn chunk_to_payload(chunk: &Chunk) -> Payload {
        let metadata: serde_json::Map<String, serde_json::Value> = chunk
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        let mut payload = serde_json::Map::new();
        payload.insert("text".to_string(), serde_json::Value::String(chunk.text.clone()));
        payload.insert("metadata".to_string(), serde_json::Value::Object(metadata));
        Payload::try_from(serde_json::Value::Object(payload)).unwrap_or_default()
    }
}

fn status_name(status: CollectionStatus) -> &'static str {
    match status {
        CollectionStatus::Green => "green",
        CollectionStatus::Yellow => "yellow",
        CollectionStatus::Red => "red",
        CollectionStatus::Grey => "grey",
        CollectionStatus::UnknownCollectionStatus => "unknown",
    }
}

#[async_trait]
impl ContentStore for QdrantContentStore {
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let exists =
            self.client.collection_exists(&self.collection_name).await.map_err(Self::map_err)?;
        if exists {
            debug!(collection = %self.collection_name, "collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection_name).vectors_config(
                    VectorParamsBuilder::new(dimensions as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(Self::map_err)?;

        info!(collection = %self.collection_name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, vectors: &[StoredVector]) -> Result<()> {
        if vectors.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = vectors
            .iter()
            .map(|vector| {
                PointStruct::new(
                    vector.id.to_string(),
                    vector.embedding.clone(),
                    Self::chunk_to_payload(&vector.chunk),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection = %self.collection_name, count = vectors.len(), "upserted points");
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection_name, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        Ok(response
            .result
            .into_iter()
            .map(|scored| ScoredChunk {
                chunk: Self::payload_to_chunk(&scored.payload),
                score: scored.score,
            })
            .collect())
    }

    async fn delete_all(&self) -> Result<()> {
        warn!(collection = %self.collection_name, "deleting collection");
        self.client.delete_collection(&self.collection_name).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        let exists =
            self.client.collection_exists(&self.collection_name).await.map_err(Self::map_err)?;
        if !exists {
            return Ok(CollectionInfo {
                collection_name: self.collection_name.clone(),
                total_documents: 0,
                vectors_count: 0,
                status: "not_found".to_string(),
            });
        }

        let response =
            self.client.collection_info(&self.collection_name).await.map_err(Self::map_err)?;
        let collection = response.result.ok_or_else(|| RagError::Store {
            backend: "qdrant".to_string(),
            message: "collection info response was empty".to_string(),
        })?;

        let points_count = collection.points_count.unwrap_or(0);
        // Every point carries exactly one vector in this system; fall back to
        // the point count when the index count is not yet meaningful.
        let vectors_count = match collection.indexed_vectors_count {
            Some(indexed) if indexed > 0 => indexed,
            _ => points_count,
        };

        Ok(CollectionInfo {
            collection_name: self.collection_name.clone(),
            total_documents: points_count,
            vectors_count,
            status: status_name(collection.status()).to_string(),
        })
    }

    async fn document_sources(&self) -> Result<Vec<String>> {
        let exists =
            self.client.collection_exists(&self.collection_name).await.map_err(Self::map_err)?;
        if !exists {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection_name)
                    .limit(SCROLL_LIMIT)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(Self::map_err)?;

        let sources: BTreeSet<String> = response
            .result
            .iter()
            .filter_map(|point| {
                Self::payload_to_chunk(&point.payload).metadata.get("source").cloned()
            })
            .collect();
        Ok(sources.into_iter().collect())
    }

    async fn healthy(&self) -> bool {
        self.client.health_check().await.is_ok()
    }
}
