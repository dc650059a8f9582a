//! Ingestion pipeline: uploaded file bytes to stored vectors.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunking::Chunker;
use crate::document::{CollectionInfo, StoredVector};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::extract::{self, FileKind};
use crate::store::ContentStore;

/// Chunks upserted per store call. Bounds the data lost to a mid-ingestion
/// failure and makes the committed count in the error exact per batch.
const UPSERT_BATCH: usize = 64;

/// The result of one successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Number of chunks created and stored.
    pub chunks_created: usize,
    /// Store-assigned identifier of every chunk, in chunk order.
    pub document_ids: Vec<Uuid>,
}

/// Orchestrates extract → chunk → embed → upsert for uploaded documents.
///
/// There is no cross-chunk transaction: a failure partway through an upload
/// leaves previously committed chunks in the store, and the error reports
/// how many (see [`RagError::Ingestion`]).
pub struct IngestionPipeline {
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ContentStore>,
}

impl IngestionPipeline {
    /// Create an ingestion pipeline from its collaborators.
    pub fn new(
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self { chunker, embedder, store }
    }

    /// Ingest one uploaded file.
    ///
    /// The declared type is derived from `file_name` and rejected before any
    /// processing when unsupported. Each chunk receives a fresh v4 UUID at
    /// insert time; ids are never reused after deletion.
    ///
    /// # Errors
    ///
    /// [`RagError::UnsupportedFormat`] / [`RagError::Extraction`] /
    /// [`RagError::Chunking`] abort with zero insertions.
    /// [`RagError::Ingestion`] reports a mid-upload embedding or store
    /// failure along with the number of chunks already committed.
    pub async fn ingest(&self, bytes: &[u8], file_name: &str) -> Result<IngestReport> {
        let kind = FileKind::from_name(file_name)?;
        let documents = extract::extract(kind, bytes, file_name)?;

        let chunks: Vec<_> =
            documents.iter().flat_map(|document| self.chunker.chunk(document)).collect();
        if chunks.is_empty() {
            return Err(RagError::Chunking(format!(
                "'{file_name}' produced no chunks after splitting"
            )));
        }

        let mut document_ids = Vec::with_capacity(chunks.len());
        let mut committed = 0;
        for batch in chunks.chunks(UPSERT_BATCH) {
            let texts: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
                error!(file = file_name, committed, error = %e, "embedding failed during ingestion");
                RagError::Ingestion { committed, message: e.to_string() }
            })?;

            let vectors: Vec<StoredVector> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| StoredVector {
                    id: Uuid::new_v4(),
                    embedding,
                    chunk: chunk.clone(),
                })
                .collect();

            self.store.upsert(&vectors).await.map_err(|e| {
                error!(file = file_name, committed, error = %e, "upsert failed during ingestion");
                RagError::Ingestion { committed, message: e.to_string() }
            })?;

            committed += vectors.len();
            document_ids.extend(vectors.iter().map(|v| v.id));
        }

        info!(file = file_name, chunks = committed, "ingested document");
        Ok(IngestReport { chunks_created: committed, document_ids })
    }

    /// Irreversibly remove every chunk in the collection.
    ///
    /// Intent confirmation is an interface concern; none happens here.
    pub async fn delete_all(&self) -> Result<()> {
        warn!("deleting entire collection");
        self.store.delete_all().await
    }

    /// Point-in-time collection snapshot; reports zeros on an empty
    /// collection rather than an error.
    pub async fn info(&self) -> Result<CollectionInfo> {
        self.store.info().await
    }

    /// Sorted unique source names across all stored chunks.
    pub async fn document_sources(&self) -> Result<Vec<String>> {
        self.store.document_sources().await
    }
}
