//! Per-thread conversation store.
//!
//! Each thread id owns an `Arc<tokio::sync::Mutex<Session>>`. The caller
//! holds that lock for a whole question/answer turn, which serializes turns
//! within one thread while distinct threads proceed in parallel. The outer
//! map lock is only held for the get-or-create, never across an await.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use labbot_core::types::ChatMessage;

/// One thread's conversation history, bounded to `max_turns` messages.
/// When the bound is exceeded the oldest messages are dropped first.
pub struct Session {
    turns: VecDeque<ChatMessage>,
    max_turns: usize,
}

impl Session {
    fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    /// Record one completed exchange. The user turn stores the unadorned
    /// question, never the augmented generation prompt.
    pub fn append_turn(&mut self, question: &str, answer: &str) {
        self.push(ChatMessage::user(question));
        self.push(ChatMessage::assistant(answer));
    }

    fn push(&mut self, message: ChatMessage) {
        self.turns.push_back(message);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// History in chronological order.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

pub struct SessionStore {
    max_turns: usize,
    sessions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the session for a thread. Lock the returned mutex for
    /// the duration of the turn.
    pub fn session(&self, thread_id: &str) -> Arc<tokio::sync::Mutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Session::new(self.max_turns))))
            .clone()
    }

    /// Drop one thread's history.
    pub fn clear(&self, thread_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if sessions.remove(thread_id).is_some() {
            tracing::debug!("Cleared session for thread {}", thread_id);
        }
    }

    /// Drop all histories.
    pub fn clear_all(&self) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let count = sessions.len();
        sessions.clear();
        tracing::info!("Cleared {} sessions", count);
    }

    /// Number of threads with live sessions.
    pub fn thread_count(&self) -> usize {
        self.sessions
            .lock()
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labbot_core::types::Role;

    #[tokio::test]
    async fn test_append_and_history_order() {
        let store = SessionStore::new(20);
        let session = store.session("t1");
        let mut guard = session.lock().await;
        guard.append_turn("鍵はどこ？", "101です。");
        guard.append_turn("ゴミ出しは？", "月曜です。");

        let history = guard.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "鍵はどこ？");
        assert_eq!(history[3].content, "月曜です。");
    }

    #[tokio::test]
    async fn test_oldest_turns_dropped_at_bound() {
        let store = SessionStore::new(4);
        let session = store.session("t1");
        let mut guard = session.lock().await;
        guard.append_turn("q1", "a1");
        guard.append_turn("q2", "a2");
        guard.append_turn("q3", "a3");

        let history = guard.history();
        assert_eq!(history.len(), 4);
        // q1/a1 fell off the front
        assert_eq!(history[0].content, "q2");
        assert_eq!(history[3].content, "a3");
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let store = SessionStore::new(20);
        store.session("a").lock().await.append_turn("qa", "aa");
        store.session("b").lock().await.append_turn("qb", "ab");

        assert_eq!(store.session("a").lock().await.len(), 2);
        assert_eq!(store.session("b").lock().await.len(), 2);
        assert_eq!(store.thread_count(), 2);

        store.clear("a");
        assert_eq!(store.thread_count(), 1);
        assert!(store.session("a").lock().await.is_empty());

        store.clear_all();
        assert_eq!(store.thread_count(), 0);
        // Sessions come back lazily on next access, empty.
        assert!(store.session("b").lock().await.is_empty());
        assert_eq!(store.thread_count(), 1);
    }

    #[tokio::test]
    async fn test_distinct_threads_progress_concurrently() {
        let store = Arc::new(SessionStore::new(20));
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("thread-{}", i % 4);
                let session = store.session(&id);
                let mut guard = session.lock().await;
                guard.append_turn(&format!("q{i}"), &format!("a{i}"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.thread_count(), 4);
        for i in 0..4 {
            let session = store.session(&format!("thread-{i}"));
            assert_eq!(session.lock().await.len(), 4);
        }
    }
}
