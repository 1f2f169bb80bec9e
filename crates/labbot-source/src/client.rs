//! Knowledge-base REST client (esa-compatible API).

use std::time::Duration;

use chrono::{DateTime, Utc};
use labbot_core::config::SourceConfig;
use labbot_core::error::{LabBotError, Result};
use labbot_core::types::Document;
use serde_json::Value;

pub struct KbClient {
    base_url: String,
    token: String,
    page_size: usize,
    page_delay_ms: u64,
    client: reqwest::Client,
}

impl KbClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        if config.team.is_empty() {
            return Err(LabBotError::Config("source.team is not set".into()));
        }
        let token = config.resolve_token();
        if token.is_empty() {
            return Err(LabBotError::Config(
                "source API token is not set (config or KB_ACCESS_TOKEN)".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Ok(Self {
            base_url: format!(
                "{}/teams/{}",
                config.base_url.trim_end_matches('/'),
                config.team
            ),
            token,
            page_size: config.page_size,
            page_delay_ms: config.page_delay_ms,
            client,
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let resp = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| LabBotError::Http(format!("source request failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LabBotError::Source(format!(
                "source API error {status}: {text}"
            )));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| LabBotError::Http(e.to_string()))
    }

    /// Fetch all posts, newest-updated first, paginated. With `updated_after`
    /// only posts updated at or after that instant are fetched.
    ///
    /// A page failure is logged and ends the walk; everything fetched up to
    /// that point is returned.
    pub async fn fetch_all(&self, updated_after: Option<DateTime<Utc>>) -> Vec<Document> {
        let url = format!("{}/posts", self.base_url);
        let mut all = Vec::new();
        let mut page = 1u64;

        loop {
            let mut query = vec![
                ("page", page.to_string()),
                ("per_page", self.page_size.to_string()),
                ("sort", "updated".to_string()),
                ("order", "desc".to_string()),
            ];
            if let Some(since) = updated_after {
                query.push(("q", format!("updated:>={}", since.to_rfc3339())));
            }

            let data = match self.get_json(&url, &query).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::error!("Fetching posts page {} failed: {}", page, e);
                    break;
                }
            };

            let posts: Vec<Document> = data["posts"]
                .as_array()
                .map(|posts| posts.iter().map(parse_post).collect())
                .unwrap_or_default();
            let fetched = posts.len();
            all.extend(posts);

            tracing::info!(
                "Fetched {}/{} posts",
                all.len(),
                data["total_count"].as_u64().unwrap_or(all.len() as u64)
            );

            let total_pages = data["total_pages"].as_u64().unwrap_or(1);
            if fetched < self.page_size || page >= total_pages {
                break;
            }
            page += 1;
            // API rate limits
            tokio::time::sleep(Duration::from_millis(self.page_delay_ms)).await;
        }

        all
    }

    /// Full-text search on the source API. Failures degrade to no results.
    pub async fn search(&self, query: &str) -> Vec<Document> {
        let url = format!("{}/posts", self.base_url);
        match self.get_json(&url, &[("q", query.to_string())]).await {
            Ok(data) => data["posts"]
                .as_array()
                .map(|posts| posts.iter().map(parse_post).collect())
                .unwrap_or_default(),
            Err(e) => {
                tracing::error!("Source search failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetch a single post by number. Failures degrade to `None`.
    pub async fn get_post(&self, post_number: u64) -> Option<Document> {
        let url = format!("{}/posts/{}", self.base_url, post_number);
        match self.get_json(&url, &[]).await {
            Ok(data) => Some(parse_post(&data)),
            Err(e) => {
                tracing::error!("Fetching post #{} failed: {}", post_number, e);
                None
            }
        }
    }
}

/// Map one wire post object to a `Document`. Missing fields become empty
/// strings; a missing number leaves the document unindexable downstream.
pub fn parse_post(post: &Value) -> Document {
    Document {
        number: post["number"].as_u64(),
        title: str_field(post, "name"),
        body_md: str_field(post, "body_md"),
        url: str_field(post, "url"),
        updated_at: str_field(post, "updated_at"),
        created_by: post["created_by"]["screen_name"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        category: str_field(post, "category"),
    }
}

fn str_field(v: &Value, key: &str) -> String {
    v[key].as_str().unwrap_or_default().to_string()
}
