//! Primary stage: vector search + hybrid rerank + grounded generation.

use std::sync::Arc;

use async_trait::async_trait;
use labbot_core::config::IndexConfig;
use labbot_core::error::{LabBotError, Result};
use labbot_core::traits::{Embedder, Provider};
use labbot_core::types::ChatMessage;
use labbot_retrieval::{source_urls, ContextFormatter, HybridRanker, VectorIndex};

use crate::prompt::{build_user_message, enhance_question, postprocess_answer, SYSTEM_PROMPT};
use crate::stage::{AnswerStage, StageAnswer};

pub struct RagStage {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    provider: Arc<dyn Provider>,
    ranker: HybridRanker,
    formatter: ContextFormatter,
    top_k: usize,
    max_context_tokens: usize,
}

impl RagStage {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        provider: Arc<dyn Provider>,
        config: &IndexConfig,
    ) -> Result<Self> {
        Ok(Self {
            index,
            embedder,
            provider,
            ranker: HybridRanker::new(config.min_similarity),
            formatter: ContextFormatter::new()?,
            top_k: config.top_k,
            max_context_tokens: config.max_context_tokens,
        })
    }
}

#[async_trait]
impl AnswerStage for RagStage {
    fn name(&self) -> &str {
        "rag"
    }

    async fn answer(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<Option<StageAnswer>> {
        let vectors = self.embedder.encode(&[question.to_string()]).await?;
        let query_vec = vectors
            .first()
            .ok_or_else(|| LabBotError::Embedding("embedder returned no vector".into()))?;

        // Over-fetch so the threshold filter still leaves top_k to choose from.
        let candidates = self.index.search(query_vec, self.top_k * 2);
        let ranked = self.ranker.rerank(question, candidates, self.top_k);
        if ranked.is_empty() {
            return Ok(None);
        }

        let context = self.formatter.format(&ranked, self.max_context_tokens);
        if context.trim().is_empty() {
            return Ok(None);
        }
        let urls = source_urls(&ranked);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(build_user_message(
            &enhance_question(question),
            &context,
        )));

        let raw = self.provider.generate(&messages).await?;
        Ok(Some(StageAnswer {
            text: postprocess_answer(&raw),
            source_urls: urls,
        }))
    }
}
