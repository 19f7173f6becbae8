//! In-memory conversation persistence.
//!
//! All state lives for the process lifetime only; a restart loses every
//! session and conversation (explicit non-goal to persist across restarts).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::llm::ChatMessage;

/// Maps caller-supplied user identifiers to durable thread identifiers.
/// `resolve` is idempotent per process lifetime.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, user_id: &str) -> String {
        if let Ok(sessions) = self.sessions.read() {
            if let Some(thread_id) = sessions.get(user_id) {
                return thread_id.clone();
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }
}

pub type Conversation = Arc<Mutex<Vec<ChatMessage>>>;

/// Per-thread message logs. Each conversation sits behind its own async
/// mutex so concurrent requests for the same thread are serialized
/// (single-writer-per-thread) instead of interleaving history appends.
#[derive(Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the conversation for a thread, creating it on first use.
    pub fn conversation(&self, thread_id: &str) -> Conversation {
        if let Ok(conversations) = self.conversations.read() {
            if let Some(conversation) = conversations.get(thread_id) {
                return conversation.clone();
            }
        }

        let mut conversations = self
            .conversations
            .write()
            .unwrap_or_else(|e| e.into_inner());
        conversations
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }

    pub fn thread_count(&self) -> usize {
        self.conversations.read().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_idempotent_per_user() {
        let registry = SessionRegistry::new();
        let first = registry.resolve("alice");
        let second = registry.resolve("alice");
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_users_get_distinct_threads() {
        let registry = SessionRegistry::new();
        assert_ne!(registry.resolve("alice"), registry.resolve("bob"));
    }

    #[tokio::test]
    async fn conversations_persist_appended_messages() {
        let store = ConversationStore::new();
        {
            let conversation = store.conversation("thread-1");
            let mut history = conversation.lock().await;
            history.push(ChatMessage::user("first"));
        }

        let conversation = store.conversation("thread-1");
        let history = conversation.lock().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "first");
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let store = ConversationStore::new();
        store
            .conversation("thread-a")
            .lock()
            .await
            .push(ChatMessage::user("for a"));

        let conversation = store.conversation("thread-b");
        assert!(conversation.lock().await.is_empty());
        assert_eq!(store.thread_count(), 2);
    }
}
