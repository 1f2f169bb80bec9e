//! # LabBot Core
//!
//! Shared foundation for the LabBot workspace: configuration, the error
//! type, data model types (documents, chunks, search results, chat turns),
//! and the traits that decouple the retrieval engine from its external
//! collaborators (LLM provider, embedding model).

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{LabBotError, Result};
