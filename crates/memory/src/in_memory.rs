//! In-memory session store: useful for testing and ephemeral deployments.

use async_trait::async_trait;
use parley_core::error::StoreError;
use parley_core::session::{Sender, Session, SessionId, SessionStore, StoredMessage, Turn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps every session's message rows in a map.
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Vec<StoredMessage>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create(&self, id: &SessionId) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .entry(id.as_str().to_string())
            .or_default();
        Ok(())
    }

    async fn fetch(&self, id: &SessionId) -> Result<Session, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(match sessions.get(id.as_str()) {
            Some(rows) => Session::from_messages(id, rows),
            None => Session::empty(id),
        })
    }

    async fn append(
        &self,
        id: &SessionId,
        sender: Sender,
        text: &str,
        is_feedback: bool,
    ) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .entry(id.as_str().to_string())
            .or_default()
            .push(StoredMessage {
                sender,
                text: text.to_string(),
                is_feedback,
            });
        Ok(())
    }

    async fn append_turn(&self, id: &SessionId, turn: &Turn) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let rows = sessions.entry(id.as_str().to_string()).or_default();
        rows.push(StoredMessage {
            sender: Sender::User,
            text: turn.user_message.clone(),
            is_feedback: turn.is_feedback,
        });
        rows.push(StoredMessage {
            sender: Sender::Bot,
            text: turn.bot_response.clone(),
            is_feedback: turn.is_feedback,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_session_has_empty_history() {
        let store = InMemorySessionStore::new();
        let session = store.fetch(&SessionId::from("ghost")).await.unwrap();
        assert_eq!(session.session_id, "ghost");
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn turns_come_back_in_order() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        store.create(&id).await.unwrap();
        store.append_turn(&id, &Turn::new("hi", "hello")).await.unwrap();
        store
            .append_turn(&id, &Turn::new("who built it?", "the team"))
            .await
            .unwrap();

        let session = store.fetch(&id).await.unwrap();
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].user_message, "hi");
        assert_eq!(session.history[1].bot_response, "the team");
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from("s1");
        store.create(&id).await.unwrap();
        store.append(&id, Sender::User, "q", false).await.unwrap();
        store.create(&id).await.unwrap();

        assert_eq!(store.session_count().await, 1);
        assert_eq!(store.fetch(&id).await.unwrap().history.len(), 1);
    }

    #[tokio::test]
    async fn feedback_flag_survives() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from("s2");
        store.append_turn(&id, &Turn::feedback("good", "thanks")).await.unwrap();
        let session = store.fetch(&id).await.unwrap();
        assert!(session.history[0].is_feedback);
        assert_eq!(session.last_user_message(), None);
    }

    #[tokio::test]
    async fn concurrent_turns_keep_their_rows_paired() {
        let store = Arc::new(InMemorySessionStore::new());
        let id = SessionId::from("busy");

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    store
                        .append_turn(&id, &Turn::new(format!("q{i}"), format!("a{i}")))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let session = store.fetch(&id).await.unwrap();
        assert_eq!(session.history.len(), 32);
        for turn in &session.history {
            assert_eq!(turn.user_message[1..], turn.bot_response[1..]);
        }
    }
}
