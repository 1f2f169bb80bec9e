//! Answer cache for the keyword-search fallback path.
//!
//! Caches by normalized question text, including the "no article found"
//! outcome, so a repeated unanswerable question does not hammer the source
//! API. Expiry is lazy: entries are evicted when looked up past their TTL.
//! Positive and negative entries share the same TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    inserted_at: Instant,
    /// `None` is a cached negative: the search ran and found nothing.
    answer: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CacheLookup {
    Hit(String),
    /// A previous search found nothing; don't search again yet.
    NegativeHit,
    Miss,
}

pub struct AnswerCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl AnswerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn lookup(&self, key: &str) -> CacheLookup {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => match &entry.answer {
                Some(answer) => CacheLookup::Hit(answer.clone()),
                None => CacheLookup::NegativeHit,
            },
            Some(_) => {
                entries.remove(key);
                CacheLookup::Miss
            }
            None => CacheLookup::Miss,
        }
    }

    /// Store an outcome. `None` records that the search found nothing.
    pub fn store(&self, key: &str, answer: Option<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            CacheEntry {
                inserted_at: Instant::now(),
                answer,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_negative_hit() {
        let cache = AnswerCache::new(Duration::from_secs(600));
        assert_eq!(cache.lookup("鍵"), CacheLookup::Miss);

        cache.store("鍵", Some("101です。".into()));
        assert_eq!(cache.lookup("鍵"), CacheLookup::Hit("101です。".into()));

        cache.store("存在しない質問", None);
        assert_eq!(cache.lookup("存在しない質問"), CacheLookup::NegativeHit);
    }

    #[test]
    fn test_expiry_is_lazy_and_symmetric() {
        let cache = AnswerCache::new(Duration::from_millis(10));
        cache.store("a", Some("x".into()));
        cache.store("b", None);
        assert_eq!(cache.len(), 2);

        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.lookup("a"), CacheLookup::Miss);
        assert_eq!(cache.lookup("b"), CacheLookup::Miss);
        // expired entries were evicted on lookup
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_overwrites() {
        let cache = AnswerCache::new(Duration::from_secs(600));
        cache.store("k", None);
        cache.store("k", Some("now answered".into()));
        assert_eq!(cache.lookup("k"), CacheLookup::Hit("now answered".into()));
        assert_eq!(cache.len(), 1);
    }
}
