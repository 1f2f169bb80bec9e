//! Last resort before the apology: static keyword knowledge.
//!
//! Hand-maintained entries for the questions every lab gets, answerable
//! even when the index is empty and the source API is down.

use async_trait::async_trait;
use labbot_core::error::Result;
use labbot_core::types::ChatMessage;

use crate::stage::{AnswerStage, StageAnswer};

pub struct KnowledgeEntry {
    keywords: Vec<String>,
    answer: String,
}

impl KnowledgeEntry {
    pub fn new(keywords: &[&str], answer: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            answer: answer.to_string(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        let normalized = text.to_lowercase();
        self.keywords.iter().any(|k| normalized.contains(k.as_str()))
    }
}

pub struct StaticKnowledgeStage {
    entries: Vec<KnowledgeEntry>,
}

impl StaticKnowledgeStage {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    pub fn with_default_entries() -> Self {
        Self::new(vec![
            KnowledgeEntry::new(
                &["研究テーマ", "テーマ", "focus", "research"],
                "当研究室では人と協調するAIシステムをテーマに、\
                 自然言語処理とロボティクスを横断した応用研究を進めています。\
                 年間を通して産学連携プロジェクトにも参加しています。",
            ),
            KnowledgeEntry::new(
                &["メンバー", "人数", "構成", "student"],
                "現在は教授1名、助教1名、博士課程3名、修士8名、学部4名が所属しています。\
                 留学生も受け入れており、英語での議論も日常的に行われます。",
            ),
            KnowledgeEntry::new(
                &["スケジュール", "ミーティング", "ゼミ", "meeting"],
                "毎週火曜午後に進捗報告ゼミ、金曜午後に論文輪講を実施しています。\
                 その他、必要に応じてプロジェクトごとの小ミーティングを設定しています。",
            ),
            KnowledgeEntry::new(
                &["設備", "環境", "gpu", "サーバ", "machine"],
                "研究室にはGPUサーバ4台とロボット実験スペースがあり、\
                 実験予約はSlackの#lab-facilityチャンネルで管理しています。",
            ),
            KnowledgeEntry::new(
                &["募集", "見学", "join", "応募", "インターン"],
                "見学希望はSlackでメンションするか、lab-admin@example.com までご連絡ください。\
                 毎月第3金曜にオンライン説明会も開催しています。",
            ),
        ])
    }
}

#[async_trait]
impl AnswerStage for StaticKnowledgeStage {
    fn name(&self) -> &str {
        "static-knowledge"
    }

    async fn answer(&self, question: &str, _: &[ChatMessage]) -> Result<Option<StageAnswer>> {
        Ok(self
            .entries
            .iter()
            .find(|entry| entry.matches(question))
            .map(|entry| StageAnswer::text_only(entry.answer.clone())))
    }
}
