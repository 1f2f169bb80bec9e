//! Question handling: sessions, the stage chain, and reply shaping.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use labbot_retrieval::VectorIndex;
use labbot_session::SessionStore;
use labbot_source::read_last_sync;

use crate::stage::{run_stages, AnswerStage};

/// Returned when every stage came up empty.
pub const NO_INFO_ANSWER: &str = "申し訳ありません。関連する情報が見つかりませんでした。";
/// Returned for a message that is empty once mentions are stripped.
pub const EMPTY_QUESTION_ANSWER: &str = "質問を入力してください。例: 研究室の鍵番号は？";

pub struct Engine {
    stages: Vec<Box<dyn AnswerStage>>,
    sessions: SessionStore,
    index: Arc<VectorIndex>,
    embedding_model: String,
    provider_name: String,
    sync_state_path: PathBuf,
}

#[derive(Debug)]
pub struct EngineStats {
    pub indexed_chunks: usize,
    pub embedding_model: String,
    pub provider_name: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub active_threads: usize,
}

impl EngineStats {
    pub fn render(&self) -> String {
        let last_sync = self
            .last_sync
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "未実行".to_string());
        format!(
            "📊 *ボット統計情報:*\n\
             • インデックス済みチャンク数: {}\n\
             • 埋め込みモデル: {}\n\
             • LLMプロバイダ: {}\n\
             • 最終同期: {}\n\
             • アクティブスレッド数: {}",
            self.indexed_chunks,
            self.embedding_model,
            self.provider_name,
            last_sync,
            self.active_threads,
        )
    }
}

impl Engine {
    pub fn new(
        stages: Vec<Box<dyn AnswerStage>>,
        sessions: SessionStore,
        index: Arc<VectorIndex>,
        embedding_model: String,
        provider_name: String,
        sync_state_path: PathBuf,
    ) -> Self {
        Self {
            stages,
            sessions,
            index,
            embedding_model,
            provider_name,
            sync_state_path,
        }
    }

    /// Answer one question in one thread. Returns the answer text and up to
    /// three source URLs.
    ///
    /// Never returns an error: a failure somewhere in the chain degrades to
    /// the fixed apology. The thread's session lock is held for the whole
    /// turn, so turns within a thread are serialized while distinct threads
    /// proceed in parallel. History records the unadorned question and
    /// whatever was actually sent back, apology included.
    pub async fn handle_question(&self, raw_text: &str, thread_id: &str) -> (String, Vec<String>) {
        let question = clean_message(raw_text);
        if question.is_empty() {
            return (EMPTY_QUESTION_ANSWER.to_string(), Vec::new());
        }

        tracing::info!("Question in thread {}: {}", thread_id, question);

        let session = self.sessions.session(thread_id);
        let mut session = session.lock().await;
        let history = session.history();

        let (answer, mut urls) = match run_stages(&self.stages, &question, &history).await {
            Some(stage_answer) => (stage_answer.text, stage_answer.source_urls),
            None => (NO_INFO_ANSWER.to_string(), Vec::new()),
        };
        urls.truncate(3);

        session.append_turn(&question, &answer);
        (answer, urls)
    }

    /// Drop one thread's conversation history.
    pub fn clear_session(&self, thread_id: &str) {
        self.sessions.clear(thread_id);
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            indexed_chunks: self.index.len(),
            embedding_model: self.embedding_model.clone(),
            provider_name: self.provider_name.clone(),
            last_sync: read_last_sync(&self.sync_state_path),
            active_threads: self.sessions.thread_count(),
        }
    }
}

/// Strip chat mention tags (`<@...>`) and collapse whitespace.
pub fn clean_message(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("<@") {
        match rest[open..].find('>') {
            Some(close) => {
                cleaned.push_str(&rest[..open]);
                cleaned.push(' ');
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    cleaned.push_str(rest);
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shape the chat reply: quoted question, answer, then up to three numbered
/// article links.
pub fn format_reply(question: &str, answer: &str, urls: &[String]) -> String {
    let mut parts = vec![format!("> {question}"), String::new(), answer.to_string()];
    if !urls.is_empty() {
        parts.push(String::new());
        parts.push("📚 *参照記事:*".to_string());
        for (i, url) in urls.iter().take(3).enumerate() {
            parts.push(format!("{}. <{}|記事を見る>", i + 1, url));
        }
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{AnswerStage, StageAnswer};
    use async_trait::async_trait;
    use labbot_core::error::{LabBotError, Result};
    use labbot_core::types::ChatMessage;

    struct Fixed {
        text: &'static str,
        urls: Vec<String>,
    }

    #[async_trait]
    impl AnswerStage for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn answer(&self, _: &str, _: &[ChatMessage]) -> Result<Option<StageAnswer>> {
            Ok(Some(StageAnswer {
                text: self.text.to_string(),
                source_urls: self.urls.clone(),
            }))
        }
    }

    struct Failing;

    #[async_trait]
    impl AnswerStage for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        async fn answer(&self, _: &str, _: &[ChatMessage]) -> Result<Option<StageAnswer>> {
            Err(LabBotError::Provider("backend down".into()))
        }
    }

    fn engine(stages: Vec<Box<dyn AnswerStage>>) -> Engine {
        Engine::new(
            stages,
            SessionStore::new(20),
            Arc::new(VectorIndex::open_in_memory().unwrap()),
            "test-embedder".into(),
            "test-provider".into(),
            std::env::temp_dir().join("labbot-engine-test-no-such-state"),
        )
    }

    #[tokio::test]
    async fn test_mentions_stripped_and_history_stores_clean_question() {
        let engine = engine(vec![Box::new(Fixed {
            text: "101です。",
            urls: vec![],
        })]);

        let (answer, _) = engine.handle_question("<@U123ABC> 鍵の番号は？", "t1").await;
        assert_eq!(answer, "101です。");

        let session = engine.sessions.session("t1");
        let history = session.lock().await.history();
        assert_eq!(history[0].content, "鍵の番号は？");
        assert_eq!(history[1].content, "101です。");
    }

    #[tokio::test]
    async fn test_all_stages_fail_yields_apology_and_history_still_updated() {
        let engine = engine(vec![Box::new(Failing)]);

        let (answer, urls) = engine.handle_question("鍵は？", "t1").await;
        assert_eq!(answer, NO_INFO_ANSWER);
        assert!(urls.is_empty());

        let session = engine.sessions.session("t1");
        let history = session.lock().await.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, NO_INFO_ANSWER);
    }

    #[tokio::test]
    async fn test_empty_question_prompts_for_input() {
        let engine = engine(vec![Box::new(Failing)]);
        let (answer, _) = engine.handle_question("<@U123>  ", "t1").await;
        assert_eq!(answer, EMPTY_QUESTION_ANSWER);
        // No turn recorded for an empty question.
        assert_eq!(engine.sessions.thread_count(), 0);
    }

    #[tokio::test]
    async fn test_urls_capped_at_three() {
        let urls: Vec<String> = (1..=5).map(|i| format!("https://e/{i}")).collect();
        let engine = engine(vec![Box::new(Fixed {
            text: "answer",
            urls,
        })]);
        let (_, urls) = engine.handle_question("q", "t1").await;
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], "https://e/1");
    }

    #[tokio::test]
    async fn test_stats_reflect_state() {
        let engine = engine(vec![Box::new(Fixed {
            text: "a",
            urls: vec![],
        })]);
        engine.handle_question("q", "t1").await;

        let stats = engine.stats();
        assert_eq!(stats.indexed_chunks, 0);
        assert_eq!(stats.active_threads, 1);
        assert!(stats.last_sync.is_none());
        assert!(stats.render().contains("test-provider"));
    }

    #[test]
    fn test_clean_message() {
        assert_eq!(clean_message("<@U1> 鍵は？"), "鍵は？");
        assert_eq!(clean_message("鍵は？ <@U1>"), "鍵は？");
        assert_eq!(clean_message("a  b\n c"), "a b c");
        assert_eq!(clean_message("<@unterminated 鍵"), "<@unterminated 鍵");
    }

    #[test]
    fn test_format_reply_with_and_without_urls() {
        let reply = format_reply("鍵は？", "101です。", &["https://e/1".to_string()]);
        assert!(reply.starts_with("> 鍵は？\n\n101です。"));
        assert!(reply.contains("📚 *参照記事:*"));
        assert!(reply.contains("1. <https://e/1|記事を見る>"));

        let reply = format_reply("鍵は？", "101です。", &[]);
        assert!(!reply.contains("参照記事"));
    }
}
