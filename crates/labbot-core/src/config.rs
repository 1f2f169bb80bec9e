//! LabBot configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabBotConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for LabBotConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            index: IndexConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl LabBotConfig {
    /// Load config from the default path (~/.labbot/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::LabBotError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::LabBotError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the LabBot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".labbot")
    }
}

/// Knowledge-base source API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Team name on the knowledge-base service.
    #[serde(default)]
    pub team: String,
    /// API token. Falls back to the `KB_ACCESS_TOKEN` env var when empty.
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_source_base_url")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Delay between paginated requests, for API rate limits.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_source_base_url() -> String { "https://api.esa.io/v1".into() }
fn default_page_size() -> usize { 100 }
fn default_page_delay_ms() -> u64 { 500 }
fn default_timeout_secs() -> u64 { 10 }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            team: String::new(),
            access_token: String::new(),
            base_url: default_source_base_url(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    /// Resolve the API token: config value first, env var fallback.
    pub fn resolve_token(&self) -> String {
        if !self.access_token.is_empty() {
            self.access_token.clone()
        } else {
            std::env::var("KB_ACCESS_TOKEN").unwrap_or_default()
        }
    }
}

/// Vector index and retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// SQLite database path. Empty means `~/.labbot/index.db`.
    #[serde(default)]
    pub db_path: String,
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum cosine similarity to keep a result. Zero or negative
    /// disables filtering.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

fn default_max_chunk_size() -> usize { 1000 }
fn default_batch_size() -> usize { 50 }
fn default_top_k() -> usize { 5 }
fn default_min_similarity() -> f32 { 0.35 }
fn default_max_context_tokens() -> usize { 2000 }

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_path: String::new(),
            max_chunk_size: default_max_chunk_size(),
            batch_size: default_batch_size(),
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

impl IndexConfig {
    pub fn resolve_db_path(&self) -> PathBuf {
        if self.db_path.is_empty() {
            LabBotConfig::home_dir().join("index.db")
        } else {
            PathBuf::from(&self.db_path)
        }
    }
}

/// Which LLM backend answers questions. Resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    Gemini,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider_kind")]
    pub provider: ProviderKind,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_kind() -> ProviderKind { ProviderKind::Ollama }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider_kind(),
            ollama: OllamaConfig::default(),
            gemini: GeminiConfig::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_base_url() -> String { "http://localhost:11434/v1".into() }
fn default_ollama_model() -> String { "llama3".into() }

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// API key. Falls back to the `GEMINI_API_KEY` env var when empty.
    #[serde(default)]
    pub api_key: String,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".into()
}
fn default_gemini_model() -> String { "gemini-2.5-flash".into() }

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            api_key: String::new(),
        }
    }
}

impl GeminiConfig {
    pub fn resolve_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            self.api_key.clone()
        } else {
            std::env::var("GEMINI_API_KEY").unwrap_or_default()
        }
    }
}

/// Embedding model configuration. Indexing and querying must use the same
/// model and normalization or similarity scores are meaningless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_base_url() -> String { "http://localhost:11434/v1".into() }
fn default_embedding_model() -> String { "intfloat/multilingual-e5-base".into() }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Conversation session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Hard bound on turns kept per thread. Oldest turns are dropped first.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize { 20 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_turns: default_max_turns() }
    }
}

/// Answer cache configuration (keyword-search fallback path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for both positive and negative entries.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 { 600 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: default_cache_ttl_secs() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LabBotConfig::default();
        assert_eq!(config.index.max_chunk_size, 1000);
        assert_eq!(config.index.batch_size, 50);
        assert!((config.index.min_similarity - 0.35).abs() < 1e-6);
        assert_eq!(config.cache.ttl_secs, 600);
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [llm]
            provider = "gemini"

            [llm.gemini]
            model = "gemini-2.5-pro"

            [index]
            min_similarity = 0.5
            top_k = 3
        "#;

        let config: LabBotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, ProviderKind::Gemini);
        assert_eq!(config.llm.gemini.model, "gemini-2.5-pro");
        assert!((config.index.min_similarity - 0.5).abs() < 1e-6);
        assert_eq!(config.index.top_k, 3);
        // Untouched sections keep their defaults
        assert_eq!(config.index.max_chunk_size, 1000);
        assert_eq!(config.session.max_turns, 20);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: LabBotConfig = toml::from_str("").unwrap();
        assert_eq!(config.source.page_size, 100);
        assert_eq!(config.source.page_delay_ms, 500);
        assert_eq!(config.index.max_context_tokens, 2000);
    }

    #[test]
    fn test_home_dir() {
        let home = LabBotConfig::home_dir();
        assert!(home.to_string_lossy().contains("labbot"));
    }
}
