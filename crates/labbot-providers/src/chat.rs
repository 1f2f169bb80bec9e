//! Unified OpenAI-compatible chat provider.
//!
//! A single struct that handles chat completions for both backends. The
//! request carries a bounded timeout; a transport failure is retried once,
//! an HTTP error status is not.

use std::time::Duration;

use async_trait::async_trait;
use labbot_core::config::LlmConfig;
use labbot_core::error::{LabBotError, Result};
use labbot_core::traits::Provider;
use labbot_core::types::ChatMessage;
use serde_json::{json, Value};

pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    model: String,
    /// Empty for local servers that require no auth.
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn ollama(config: &LlmConfig) -> Self {
        Self::new(
            "ollama",
            &config.ollama.base_url,
            &config.ollama.model,
            String::new(),
            config.timeout_secs,
        )
    }

    pub fn gemini(config: &LlmConfig, api_key: String) -> Self {
        Self::new(
            "gemini",
            &config.gemini.base_url,
            &config.gemini.model,
            api_key,
            config.timeout_secs,
        )
    }

    fn new(name: &str, base_url: &str, model: &str, api_key: String, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
        }
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            req
        } else {
            req.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }

    /// POST the body, retrying once on a transport failure. HTTP error
    /// statuses are never retried.
    async fn post_chat(&self, body: &Value) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        for attempt in 0..2 {
            let req = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(body);
            match self.apply_auth(req).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt == 0 => {
                    tracing::warn!("{} request failed, retrying once: {}", self.name, e);
                }
                Err(e) => {
                    return Err(LabBotError::Http(format!(
                        "{} connection failed ({}): {}",
                        self.name, url, e
                    )));
                }
            }
        }
        unreachable!("post_chat loop returns on every path")
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": messages,
        });

        let resp = self.post_chat(&body).await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LabBotError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| LabBotError::Http(e.to_string()))?;

        let content = json["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| LabBotError::Provider(format!("{}: no choices in response", self.name)))?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labbot_core::config::LlmConfig;

    #[test]
    fn test_ollama_needs_no_auth() {
        let provider = OpenAiCompatibleProvider::ollama(&LlmConfig::default());
        assert_eq!(provider.name(), "ollama");
        assert!(provider.api_key.is_empty());
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_gemini_carries_key_and_endpoint() {
        let provider = OpenAiCompatibleProvider::gemini(&LlmConfig::default(), "k-123".into());
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.api_key, "k-123");
        assert!(provider.base_url.contains("generativelanguage"));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let provider =
            OpenAiCompatibleProvider::new("ollama", "http://host:1/v1/", "m", String::new(), 10);
        assert_eq!(provider.base_url, "http://host:1/v1");
    }

    #[test]
    fn test_messages_serialize_openai_shape() {
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("質問"),
        ];
        let body = json!({ "model": "llama3", "messages": messages });
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "質問");
    }
}
