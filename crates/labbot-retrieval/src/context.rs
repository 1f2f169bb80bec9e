//! Token-bounded prompt context assembly.

use labbot_core::error::{LabBotError, Result};
use labbot_core::types::RankedResult;
use tiktoken_rs::CoreBPE;

/// Formats ranked chunks into the reference block handed to the LLM,
/// counting tokens with cl100k_base.
pub struct ContextFormatter {
    bpe: CoreBPE,
}

impl ContextFormatter {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| LabBotError::Config(format!("Failed to load tokenizer: {e}")))?;
        Ok(Self { bpe })
    }

    /// Append each result's block in rank order until the next block would
    /// exceed `max_tokens`. That block and all following ones are discarded;
    /// partial blocks are never emitted and blocks are never reordered.
    pub fn format(&self, results: &[RankedResult], max_tokens: usize) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut total_tokens = 0usize;

        for (i, ranked) in results.iter().enumerate() {
            let meta = &ranked.result.metadata;
            let part = format!(
                "\n【参照{}】\n記事タイトル: {}\nカテゴリ: {}\n更新日: {}\n内容:\n{}\n---",
                i + 1,
                display_or_na(&meta.title),
                display_or_na(&meta.category),
                display_or_na(&meta.updated_at),
                ranked.result.text,
            );

            let part_tokens = self.bpe.encode_ordinary(&part).len();
            if total_tokens + part_tokens > max_tokens {
                break;
            }

            parts.push(part);
            total_tokens += part_tokens;
        }

        parts.join("\n")
    }

    /// Count tokens in an arbitrary string with the same encoding the
    /// context budget uses.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

fn display_or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}

/// Source URLs of the ranked results, deduplicated by document and in rank
/// order. Results without a URL contribute nothing.
pub fn source_urls(results: &[RankedResult]) -> Vec<String> {
    let mut urls = Vec::new();
    let mut seen_posts = Vec::new();

    for ranked in results {
        let meta = &ranked.result.metadata;
        if seen_posts.contains(&meta.post_number) || meta.url.is_empty() {
            continue;
        }
        urls.push(meta.url.clone());
        seen_posts.push(meta.post_number);
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use labbot_core::types::{ChunkMetadata, SearchResult};

    fn ranked(post: u64, text: &str, url: &str) -> RankedResult {
        RankedResult {
            result: SearchResult {
                text: text.into(),
                metadata: ChunkMetadata {
                    post_number: post,
                    title: format!("記事{post}"),
                    url: url.into(),
                    updated_at: "2025-06-01".into(),
                    created_by: String::new(),
                    category: "lab".into(),
                    chunk_index: 0,
                },
                distance: 0.2,
                similarity: Some(0.8),
            },
            final_score: 0.2,
        }
    }

    #[test]
    fn test_blocks_in_rank_order() {
        let formatter = ContextFormatter::new().unwrap();
        let results = vec![ranked(1, "first body", "u1"), ranked(2, "second body", "u2")];
        let context = formatter.format(&results, 2000);
        let first = context.find("first body").unwrap();
        let second = context.find("second body").unwrap();
        assert!(first < second);
        assert!(context.contains("【参照1】"));
        assert!(context.contains("【参照2】"));
    }

    #[test]
    fn test_budget_never_exceeded_no_partial_blocks() {
        let formatter = ContextFormatter::new().unwrap();
        let long_body = "研究室の運用ルールについての長い説明。".repeat(50);
        let results = vec![
            ranked(1, &long_body, "u1"),
            ranked(2, &long_body, "u2"),
            ranked(3, "short", "u3"),
        ];

        let one_block_tokens = {
            let single = formatter.format(&results[..1], 1_000_000);
            formatter.count_tokens(&single)
        };

        // Budget fits one block but not two: the second block is discarded
        // and so is everything after it, even though the third would fit.
        let context = formatter.format(&results, one_block_tokens + 10);
        assert!(context.contains("【参照1】"));
        assert!(!context.contains("【参照2】"));
        assert!(!context.contains("short"));
        assert!(formatter.count_tokens(&context) <= one_block_tokens + 10);
    }

    #[test]
    fn test_empty_results_give_empty_context() {
        let formatter = ContextFormatter::new().unwrap();
        assert!(formatter.format(&[], 2000).is_empty());
    }

    #[test]
    fn test_source_urls_dedup_by_document() {
        let results = vec![
            ranked(1, "a", "https://e/1"),
            ranked(1, "b", "https://e/1"),
            ranked(2, "c", "https://e/2"),
            ranked(3, "d", ""),
        ];
        assert_eq!(source_urls(&results), vec!["https://e/1", "https://e/2"]);
    }
}
