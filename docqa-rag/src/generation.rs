//! Answer generation collaborator trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::document::Chunk;
use crate::error::Result;

/// An ordered, finite, non-restartable sequence of answer-text fragments.
///
/// Concatenating the fragments in emission order yields the complete answer.
/// The stream is pull-based: dropping it cancels production at the next
/// opportunity, so a disconnected consumer does not keep the generation
/// collaborator busy.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A collaborator that produces a natural-language answer from a question
/// and retrieved context chunks.
///
/// An empty context is a valid input: the answerer must still respond,
/// typically stating that it cannot find relevant information.
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Produce the complete answer text.
    async fn complete(&self, question: &str, context: &[Chunk]) -> Result<String>;

    /// Produce the answer as an incremental fragment stream.
    async fn stream(&self, question: &str, context: &[Chunk]) -> Result<TokenStream>;
}
