//! Shared data model: documents, chunks, search results, chat turns.

use serde::{Deserialize, Serialize};

/// A knowledge-base article as fetched from the source API.
///
/// Immutable once fetched; a re-fetch on update supersedes it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable article number. Documents without one cannot be indexed
    /// because chunk ids must stay stable across re-indexing.
    pub number: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body_md: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub category: String,
}

/// Metadata carried by every indexed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub post_number: u64,
    pub title: String,
    pub url: String,
    pub updated_at: String,
    pub created_by: String,
    pub category: String,
    pub chunk_index: usize,
}

/// A bounded text segment derived from exactly one document — the unit of
/// indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `post_{number}_chunk_{index}` — unique and stable across re-indexing
    /// of the same document.
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn id_for(post_number: u64, chunk_index: usize) -> String {
        format!("post_{post_number}_chunk_{chunk_index}")
    }
}

/// One vector-search hit. Ephemeral — produced per query, never persisted.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance (1 − similarity). Lower is closer.
    pub distance: f32,
    /// Cosine similarity in [-1, 1], when defined.
    pub similarity: Option<f32>,
}

/// A search result after hybrid reranking.
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub result: SearchResult,
    /// distance − keyword boost. Lower is better.
    pub final_score: f32,
}

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}
