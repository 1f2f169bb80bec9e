//! Traits at the boundary to external collaborators.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ChatMessage;

/// A language-model backend that turns a conversation into answer text.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Generate a completion for the given conversation.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// An embedding model that turns text into fixed-size L2-normalized vectors.
///
/// The same implementation must be used for indexing and for querying.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    /// Encode a batch of texts into normalized vectors, one per input.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
