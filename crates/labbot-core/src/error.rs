//! LabBot error type.

use thiserror::Error;

/// Errors produced anywhere in the LabBot workspace.
#[derive(Debug, Error)]
pub enum LabBotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Knowledge source error: {0}")]
    Source(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LabBotError>;
