//! Hybrid ranker: vector distance adjusted by keyword-overlap boosts.

use labbot_core::types::{RankedResult, SearchResult};

use crate::keywords::extract_keywords;

/// Boost per keyword found anywhere in the chunk text.
const TEXT_MATCH_BOOST: f32 = 0.1;
/// Boost when any keyword matches the chunk's title metadata.
const TITLE_MATCH_BOOST: f32 = 0.2;

/// Deterministic, rule-based reranker. No learned components.
pub struct HybridRanker {
    /// Results with similarity below this are dropped. Zero or negative
    /// disables filtering. Results with no similarity are never filtered.
    min_similarity: f32,
}

impl HybridRanker {
    pub fn new(min_similarity: f32) -> Self {
        Self { min_similarity }
    }

    /// Reorder candidates by `distance − keyword_boost` (ascending), filter
    /// by the similarity threshold, and truncate to `top_k`.
    ///
    /// An empty return means "no relevant information found" — the caller
    /// must not treat it as an error.
    pub fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Vec<RankedResult> {
        let keywords: Vec<String> = extract_keywords(query)
            .into_iter()
            .map(|k| k.to_lowercase())
            .collect();

        let mut ranked: Vec<RankedResult> = candidates
            .into_iter()
            .map(|result| {
                let text = result.text.to_lowercase();
                let title = result.metadata.title.to_lowercase();

                let mut boost = 0.0;
                for keyword in &keywords {
                    if text.contains(keyword.as_str()) {
                        boost += TEXT_MATCH_BOOST;
                    }
                }
                if keywords.iter().any(|k| title.contains(k.as_str())) {
                    boost += TITLE_MATCH_BOOST;
                }

                let final_score = result.distance - boost;
                RankedResult { result, final_score }
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.final_score
                .partial_cmp(&b.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let filtered: Vec<RankedResult> = if self.min_similarity > 0.0 {
            ranked
                .into_iter()
                .filter(|r| match r.result.similarity {
                    Some(sim) => sim >= self.min_similarity,
                    None => true,
                })
                .collect()
        } else {
            ranked
        };

        if filtered.is_empty() {
            tracing::info!(
                "No results above similarity threshold {:.2}",
                self.min_similarity
            );
        }

        filtered.into_iter().take(top_k).collect()
    }
}
