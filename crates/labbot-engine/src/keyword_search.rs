//! Fallback stage: keyword search against the source API.
//!
//! Used when vector search finds nothing relevant. Queries widen
//! progressively (full question, joined keywords, each keyword), candidates
//! are rescored locally by keyword hits, and the formatted outcome —
//! including "nothing found" — is cached for the TTL so repeated questions
//! don't hammer the API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use labbot_core::error::Result;
use labbot_core::types::{ChatMessage, Document};
use labbot_retrieval::extract_keywords;
use labbot_session::{AnswerCache, CacheLookup};
use labbot_source::KbClient;

use crate::stage::{AnswerStage, StageAnswer};

const EXCERPT_LIMIT: usize = 200;
const FALLBACK_EXCERPT: &str = "関連する記事が見つかりました。詳細は以下のリンクをご確認ください。";

pub struct KeywordSearchStage {
    client: Arc<KbClient>,
    cache: AnswerCache,
}

impl KeywordSearchStage {
    pub fn new(client: Arc<KbClient>, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache: AnswerCache::new(cache_ttl),
        }
    }
}

#[async_trait]
impl AnswerStage for KeywordSearchStage {
    fn name(&self) -> &str {
        "keyword-search"
    }

    async fn answer(&self, question: &str, _: &[ChatMessage]) -> Result<Option<StageAnswer>> {
        let cache_key = question.to_lowercase();
        match self.cache.lookup(&cache_key) {
            CacheLookup::Hit(answer) => return Ok(Some(StageAnswer::text_only(answer))),
            CacheLookup::NegativeHit => return Ok(None),
            CacheLookup::Miss => {}
        }

        let keywords = extract_keywords(question);
        let mut best: Option<(Document, i64)> = None;

        for query in build_queries(question, &keywords) {
            let posts = self.client.search(&query).await;
            if posts.is_empty() {
                continue;
            }
            let (selected, score) = select_best_post(&posts, &keywords);
            if best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((selected.clone(), score));
            }
            // Every keyword accounted for; wider queries can't do better.
            if !keywords.is_empty() && score >= keywords.len() as i64 {
                break;
            }
        }

        let answer = best.map(|(post, _)| format_post_answer(&post, EXCERPT_LIMIT));
        self.cache.store(&cache_key, answer.clone());
        Ok(answer.map(StageAnswer::text_only))
    }
}

/// Progressively broader queries: the full question first, then the joined
/// keywords, then each keyword alone. Duplicates are skipped.
fn build_queries(text: &str, keywords: &[String]) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    if !text.is_empty() {
        queries.push(text.to_string());
    }
    if !keywords.is_empty() {
        let joined = keywords.join(" ");
        if !queries.contains(&joined) {
            queries.push(joined);
        }
        for keyword in keywords {
            if !queries.contains(keyword) {
                queries.push(keyword.clone());
            }
        }
    }
    queries
}

/// Rescore candidates by keyword hits: a title hit weighs three body hits.
/// First-seen wins ties. No keywords means the API's own order stands.
fn select_best_post<'a>(posts: &'a [Document], keywords: &[String]) -> (&'a Document, i64) {
    if keywords.is_empty() {
        return (&posts[0], 0);
    }

    let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let mut best = &posts[0];
    let mut best_score = -1i64;

    for post in posts {
        let title = post.title.to_lowercase();
        let body = post.body_md.to_lowercase();
        let title_hits = lowered.iter().filter(|k| title.contains(k.as_str())).count() as i64;
        let body_hits = lowered.iter().filter(|k| body.contains(k.as_str())).count() as i64;
        let score = title_hits * 3 + body_hits;
        if score > best_score {
            best = post;
            best_score = score;
        }
    }

    (best, best_score)
}

/// Title, a plain-text excerpt of the body, and a link to the article.
fn format_post_answer(post: &Document, excerpt_limit: usize) -> String {
    let mut excerpt = extract_excerpt(&post.body_md);
    if excerpt.is_empty() {
        excerpt = FALLBACK_EXCERPT.to_string();
    }
    let excerpt = truncate_chars(&excerpt, excerpt_limit);

    if post.url.is_empty() {
        format!("*{}*\n{}", post.title, excerpt)
    } else {
        format!("*{}*\n{}\n<{}|続きを読む>", post.title, excerpt, post.url)
    }
}

/// First non-blank body line with markdown decoration stripped.
fn extract_excerpt(body_md: &str) -> String {
    for line in body_md.lines() {
        let stripped = line.trim().trim_start_matches(['#', '*', '-', ' ']);
        if stripped.is_empty() {
            continue;
        }
        let text = strip_markdown_links(stripped);
        let text = text.replace(['*', '_', '`'], "");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            return text;
        }
    }
    String::new()
}

/// `[label](target)` becomes `label`. Unbalanced brackets pass through.
fn strip_markdown_links(line: &str) -> String {
    let mut out = String::new();
    let mut rest = line;
    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find("](").map(|i| open + i) else {
            break;
        };
        let Some(end) = rest[close..].find(')').map(|i| close + i) else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str(&rest[open + 1..close]);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Character-based truncation (byte truncation would split multibyte text).
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}
