//! Index synchronization: fetch updated posts, chunk, embed, replace.
//!
//! The last successful sync instant is persisted as a plain RFC 3339 string
//! so the next run can fetch incrementally. A document that fails to embed
//! or index is logged and skipped; the pass continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use labbot_core::error::Result;
use labbot_core::traits::Embedder;
use labbot_core::types::Document;
use labbot_retrieval::{split_document, VectorIndex};

use crate::client::KbClient;

#[derive(Debug, Default)]
pub struct SyncReport {
    pub fetched: usize,
    pub indexed_documents: usize,
    pub indexed_chunks: usize,
    pub skipped: usize,
}

pub struct SyncService {
    client: KbClient,
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    max_chunk_size: usize,
    state_path: PathBuf,
}

impl SyncService {
    pub fn new(
        client: KbClient,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        max_chunk_size: usize,
        state_path: PathBuf,
    ) -> Self {
        Self {
            client,
            index,
            embedder,
            max_chunk_size,
            state_path,
        }
    }

    /// Instant of the last completed sync, if one was recorded.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        read_last_sync(&self.state_path)
    }

    fn store_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.state_path, at.to_rfc3339())?;
        Ok(())
    }

    /// Run one sync pass. `full` ignores the stored timestamp and re-fetches
    /// everything.
    pub async fn run(&self, full: bool) -> Result<SyncReport> {
        let started_at = Utc::now();
        let updated_after = if full { None } else { self.last_sync() };

        match updated_after {
            Some(since) => tracing::info!("Incremental sync since {}", since.to_rfc3339()),
            None => tracing::info!("Full sync"),
        }

        let documents = self.client.fetch_all(updated_after).await;
        let mut report = SyncReport {
            fetched: documents.len(),
            ..SyncReport::default()
        };

        for document in &documents {
            match self.index_document(document).await {
                Ok(0) => report.skipped += 1,
                Ok(chunks) => {
                    report.indexed_documents += 1;
                    report.indexed_chunks += chunks;
                }
                Err(e) => {
                    tracing::error!(
                        "Indexing '{}' (#{:?}) failed, skipping: {}",
                        document.title,
                        document.number,
                        e
                    );
                    report.skipped += 1;
                }
            }
        }

        self.store_last_sync(started_at)?;
        tracing::info!(
            "Sync done: {} fetched, {} indexed ({} chunks), {} skipped",
            report.fetched,
            report.indexed_documents,
            report.indexed_chunks,
            report.skipped
        );
        Ok(report)
    }

    /// Chunk, embed and atomically replace one document in the index.
    /// Returns the number of chunks written (0 = nothing indexable).
    pub async fn index_document(&self, document: &Document) -> Result<usize> {
        let chunks = split_document(document, self.max_chunk_size);
        if chunks.is_empty() {
            return Ok(0);
        }
        // number is present whenever split_document produced chunks
        let post_number = chunks[0].metadata.post_number;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.encode(&texts).await?;
        self.index.replace_document(post_number, &chunks, embeddings)?;
        Ok(chunks.len())
    }
}

/// Read a persisted last-sync instant. Missing or unparseable state means
/// "never synced".
pub fn read_last_sync(path: &Path) -> Option<DateTime<Utc>> {
    let content = std::fs::read_to_string(path).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Ignoring unparseable last-sync timestamp: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use labbot_core::config::SourceConfig;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| vec![t.chars().count() as f32, 1.0])
                .collect())
        }
    }

    fn service(state_path: PathBuf) -> SyncService {
        let client = KbClient::new(&SourceConfig {
            team: "lab".into(),
            access_token: "test-token".into(),
            ..SourceConfig::default()
        })
        .unwrap();
        SyncService::new(
            client,
            Arc::new(VectorIndex::open_in_memory().unwrap()),
            Arc::new(FixedEmbedder),
            1000,
            state_path,
        )
    }

    fn temp_state_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("labbot-sync-{}-{}", tag, std::process::id()))
    }

    #[tokio::test]
    async fn test_index_document_writes_chunks() {
        let svc = service(temp_state_path("index"));
        let doc = Document {
            number: Some(7),
            title: "掃除当番".into(),
            body_md: "## 当番表\n毎週金曜に交代します。".into(),
            url: "https://lab.esa.io/posts/7".into(),
            updated_at: "2025-06-01T00:00:00+09:00".into(),
            created_by: "prof".into(),
            category: "運用".into(),
        };

        let written = svc.index_document(&doc).await.unwrap();
        assert!(written > 0);
        assert_eq!(svc.index.len(), written);

        // Re-indexing the same document replaces, never duplicates.
        let again = svc.index_document(&doc).await.unwrap();
        assert_eq!(again, written);
        assert_eq!(svc.index.len(), written);
    }

    #[tokio::test]
    async fn test_index_document_without_number_is_skipped() {
        let svc = service(temp_state_path("skip"));
        let doc = Document {
            number: None,
            title: "番号なし".into(),
            body_md: "本文".into(),
            url: String::new(),
            updated_at: String::new(),
            created_by: String::new(),
            category: String::new(),
        };
        assert_eq!(svc.index_document(&doc).await.unwrap(), 0);
        assert!(svc.index.is_empty());
    }

    #[test]
    fn test_last_sync_roundtrip() {
        let path = temp_state_path("ts");
        let _ = std::fs::remove_file(&path);
        let svc = service(path.clone());

        assert!(svc.last_sync().is_none());

        let at = Utc::now();
        svc.store_last_sync(at).unwrap();
        let loaded = svc.last_sync().unwrap();
        assert_eq!(loaded.timestamp(), at.timestamp());

        std::fs::write(&path, "not a timestamp").unwrap();
        assert!(svc.last_sync().is_none());

        let _ = std::fs::remove_file(&path);
    }
}
