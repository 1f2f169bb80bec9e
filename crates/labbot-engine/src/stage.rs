//! Fallback-chain combinator over answer stages.

use async_trait::async_trait;
use labbot_core::error::Result;
use labbot_core::types::ChatMessage;

/// What a stage produced: the answer text plus the source URLs backing it
/// (may be empty — some stages embed their link in the text).
#[derive(Debug, Clone)]
pub struct StageAnswer {
    pub text: String,
    pub source_urls: Vec<String>,
}

impl StageAnswer {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_urls: Vec::new(),
        }
    }
}

/// One way of answering a question. `Ok(None)` means "nothing for this
/// question, try the next stage"; an error is treated the same by the
/// combinator, after logging.
#[async_trait]
pub trait AnswerStage: Send + Sync {
    fn name(&self) -> &str;

    async fn answer(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<Option<StageAnswer>>;
}

/// Run stages in order; the first present answer wins.
pub async fn run_stages(
    stages: &[Box<dyn AnswerStage>],
    question: &str,
    history: &[ChatMessage],
) -> Option<StageAnswer> {
    for stage in stages {
        match stage.answer(question, history).await {
            Ok(Some(answer)) => {
                tracing::info!("Stage '{}' answered", stage.name());
                return Some(answer);
            }
            Ok(None) => {
                tracing::debug!("Stage '{}' had no answer", stage.name());
            }
            Err(e) => {
                tracing::warn!("Stage '{}' failed, falling through: {}", stage.name(), e);
            }
        }
    }
    None
}
