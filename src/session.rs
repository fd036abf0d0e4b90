//! Conversation session tracking.
//!
//! An explicit, owned store with process lifetime. Per-session mutation is
//! serialized by the interior mutex so concurrent appends on one session
//! cannot lose updates.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// One question/answer round in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub query: String,
    pub answer: String,
}

/// Bounded per-session conversation history.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, VecDeque<Exchange>>>,
    max_exchanges: usize,
}

impl SessionStore {
    /// Create a store keeping at most `max_exchanges` rounds per session.
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_exchanges,
        }
    }

    /// Mint a fresh opaque session id.
    pub fn create_session(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// History is plain data, so a panic while the lock was held cannot leave
    /// it in an unusable state. Poisoned locks are recovered rather than
    /// propagated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Exchange>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an exchange, creating the session if absent. The oldest
    /// exchange is evicted once the cap is reached.
    pub fn append(&self, session_id: &str, query: &str, answer: &str) {
        let mut sessions = self.lock();
        let history = sessions.entry(session_id.to_string()).or_default();

        history.push_back(Exchange {
            query: query.to_string(),
            answer: answer.to_string(),
        });
        while history.len() > self.max_exchanges {
            history.pop_front();
        }
    }

    /// Render a session's history as prompt context, oldest first.
    /// Unknown or empty sessions yield None.
    pub fn render(&self, session_id: &str) -> Option<String> {
        let sessions = self.lock();
        let history = sessions.get(session_id)?;
        if history.is_empty() {
            return None;
        }

        let rendered = history
            .iter()
            .map(|e| format!("User: {}\nAssistant: {}", e.query, e.answer))
            .collect::<Vec<_>>()
            .join("\n");
        Some(rendered)
    }

    /// Drop a session's history. Unknown ids are a no-op.
    pub fn clear(&self, session_id: &str) {
        let mut sessions = self.lock();
        if let Some(history) = sessions.get_mut(session_id) {
            history.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_unique_ids() {
        let store = SessionStore::new(2);
        let a = store.create_session();
        let b = store.create_session();
        assert_ne!(a, b);
    }

    #[test]
    fn test_append_creates_session() {
        let store = SessionStore::new(2);
        store.append("s1", "What is RAG?", "Retrieval-Augmented Generation.");

        let rendered = store.render("s1").unwrap();
        assert!(rendered.contains("User: What is RAG?"));
        assert!(rendered.contains("Assistant: Retrieval-Augmented Generation."));
    }

    #[test]
    fn test_render_unknown_session() {
        let store = SessionStore::new(2);
        assert!(store.render("missing").is_none());
    }

    #[test]
    fn test_fifo_eviction() {
        let store = SessionStore::new(2);
        store.append("s1", "Q1", "A1");
        store.append("s1", "Q2", "A2");
        store.append("s1", "Q3", "A3");

        let rendered = store.render("s1").unwrap();
        assert!(!rendered.contains("Q1"));
        assert!(rendered.contains("Q2"));
        assert!(rendered.contains("Q3"));

        // Chronological order is preserved
        let q2 = rendered.find("Q2").unwrap();
        let q3 = rendered.find("Q3").unwrap();
        assert!(q2 < q3);
    }

    #[test]
    fn test_clear_session() {
        let store = SessionStore::new(2);
        store.append("s1", "Q", "A");
        store.clear("s1");
        assert!(store.render("s1").is_none());

        // Clearing an unknown session is fine
        store.clear("nope");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new(2);
        store.append("s1", "Q1", "A1");
        store.append("s2", "Q2", "A2");

        assert!(!store.render("s1").unwrap().contains("Q2"));
        assert!(!store.render("s2").unwrap().contains("Q1"));
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let store = std::sync::Arc::new(SessionStore::new(2));
        store.append("s1", "Q1", "A1");

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.sessions.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        // The store keeps working after a panic poisoned the mutex
        store.append("s1", "Q2", "A2");
        let rendered = store.render("s1").unwrap();
        assert!(rendered.contains("Q1"));
        assert!(rendered.contains("Q2"));
        store.clear("s1");
        assert!(store.render("s1").is_none());
    }
}
