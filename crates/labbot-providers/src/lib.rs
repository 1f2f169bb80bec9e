//! # LabBot Providers
//!
//! LLM backends for answer generation, plus the embedding client.
//!
//! Both supported providers (Ollama, Gemini) expose the OpenAI-compatible
//! chat surface, so a single `OpenAiCompatibleProvider` handles both —
//! they differ only in endpoint URL, model, and auth. The provider is
//! named by an explicit config enum and resolved exactly once at startup;
//! nothing downstream inspects the environment.

pub mod chat;
pub mod embeddings;

pub use chat::OpenAiCompatibleProvider;
pub use embeddings::HttpEmbedder;

use labbot_core::config::{LlmConfig, ProviderKind};
use labbot_core::error::{LabBotError, Result};
use labbot_core::traits::Provider;

/// Create the configured provider.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn Provider>> {
    match config.provider {
        ProviderKind::Ollama => {
            tracing::info!("Using Ollama provider: {}", config.ollama.model);
            Ok(Box::new(OpenAiCompatibleProvider::ollama(config)))
        }
        ProviderKind::Gemini => {
            let api_key = config.gemini.resolve_api_key();
            if api_key.is_empty() {
                return Err(LabBotError::ApiKeyMissing("gemini".into()));
            }
            tracing::info!("Using Gemini provider: {}", config.gemini.model);
            Ok(Box::new(OpenAiCompatibleProvider::gemini(config, api_key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_resolves_ollama() {
        let provider = create_provider(&LlmConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_create_provider_gemini_without_key_fails() {
        let mut config = LlmConfig::default();
        config.provider = ProviderKind::Gemini;
        if std::env::var("GEMINI_API_KEY").is_err() {
            assert!(matches!(
                create_provider(&config),
                Err(LabBotError::ApiKeyMissing(_))
            ));
        }
    }
}
