//! HTTP embedding client (OpenAI-compatible `/embeddings` endpoint).
//!
//! The same client embeds documents at index time and queries at search
//! time. Vectors are L2-normalized locally so cosine similarity reduces to
//! an inner product regardless of what the serving side returns.

use std::time::Duration;

use async_trait::async_trait;
use labbot_core::config::EmbeddingConfig;
use labbot_core::error::{LabBotError, Result};
use labbot_core::traits::Embedder;
use labbot_retrieval::index::l2_normalize;
use serde_json::{json, Value};

pub struct HttpEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
        }
    }

    fn parse_vectors(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>> {
        let data = json["data"]
            .as_array()
            .ok_or_else(|| LabBotError::Embedding("no data array in response".into()))?;
        if data.len() != expected {
            return Err(LabBotError::Embedding(format!(
                "expected {} embeddings, got {}",
                expected,
                data.len()
            )));
        }

        data.iter()
            .map(|item| {
                let raw = item["embedding"]
                    .as_array()
                    .ok_or_else(|| LabBotError::Embedding("missing embedding field".into()))?;
                let mut vector: Vec<f32> =
                    raw.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
                if vector.is_empty() {
                    return Err(LabBotError::Embedding("empty embedding vector".into()));
                }
                l2_normalize(&mut vector);
                Ok(vector)
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": texts,
        });

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LabBotError::Http(format!("embedding request failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LabBotError::Embedding(format!(
                "embedding API error {status}: {text}"
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| LabBotError::Http(e.to_string()))?;

        Self::parse_vectors(&json, texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vectors_normalizes() {
        let json = json!({
            "data": [
                { "embedding": [3.0, 4.0] },
                { "embedding": [0.0, 2.0] }
            ]
        });
        let vectors = HttpEmbedder::parse_vectors(&json, 2).unwrap();
        assert!((vectors[0][0] - 0.6).abs() < 1e-6);
        assert!((vectors[0][1] - 0.8).abs() < 1e-6);
        assert!((vectors[1][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_vectors_count_mismatch_rejected() {
        let json = json!({ "data": [ { "embedding": [1.0] } ] });
        assert!(HttpEmbedder::parse_vectors(&json, 2).is_err());
    }

    #[test]
    fn test_parse_vectors_missing_field_rejected() {
        let json = json!({ "data": [ { "vector": [1.0] } ] });
        assert!(HttpEmbedder::parse_vectors(&json, 1).is_err());
    }
}
