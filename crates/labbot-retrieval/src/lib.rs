//! # LabBot Retrieval
//!
//! The retrieval and ranking engine: everything between a raw question and
//! the context block handed to the LLM.
//!
//! ## How it works
//! ```text
//! Document ──┐
//!            ├─ Chunker ─ header-aware, size-bounded chunks
//!            └─ Embedder (external) ─ normalized vectors
//!                      ↓
//!               VectorIndex (SQLite persistence, in-memory cosine search)
//!
//! Question ──┬─ keyword extraction (script-aware, no morphological deps)
//!            └─ query embedding
//!                      ↓
//!               HybridRanker ─ distance − keyword boosts, threshold filter
//!                      ↓
//!               ContextFormatter ─ token-bounded 【参照N】 blocks
//! ```
//!
//! Ranking is deterministic and rule-based: the same inputs always produce
//! the same output order.

pub mod chunker;
pub mod context;
pub mod index;
pub mod keywords;
pub mod rank;

pub use chunker::split_document;
pub use context::{source_urls, ContextFormatter};
pub use index::VectorIndex;
pub use keywords::extract_keywords;
pub use rank::HybridRanker;
