//! Embedding collaborator trait.

use async_trait::async_trait;

use crate::error::Result;

/// A collaborator that maps text to fixed-length numeric vectors.
///
/// The same embedder instance must be used for ingested chunks and incoming
/// questions: vector-space compatibility is a hard precondition for
/// meaningful similarity search and cannot be checked locally.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving input order.
    ///
    /// The default implementation embeds sequentially; backends with native
    /// batching should override it.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Dimensionality of the produced vectors.
    fn dimensions(&self) -> usize;
}
