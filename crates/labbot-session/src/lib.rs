//! # LabBot Session
//!
//! Conversation state: bounded per-thread history with per-key locking, and
//! the TTL answer cache used by the keyword-search fallback path.

pub mod cache;
pub mod store;

pub use cache::{AnswerCache, CacheLookup};
pub use store::{Session, SessionStore};
