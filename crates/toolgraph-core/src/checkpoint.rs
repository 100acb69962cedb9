//! Checkpoint Persistence
//!
//! Per-user conversation history with replace-on-write semantics: one
//! checkpoint per user id, replaced wholesale on every save, deleted on
//! explicit clear. The backend is a generic key-value document store;
//! persistence failures never abort a run.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// Minimal persisted form of a message: role tag plus content.
///
/// Deliberately excludes tool-call metadata and anything else the model
/// client attaches, so stored checkpoints stay readable across message
/// schema changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedMessage {
    /// Role tag (`human` / `ai` / `tool`)
    #[serde(rename = "type")]
    pub kind: String,

    /// Text content
    pub data: Option<String>,
}

/// One stored checkpoint: the whole conversation for one user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckpointDocument {
    pub user_id: String,
    pub messages: Vec<PersistedMessage>,
    pub timestamp: DateTime<Utc>,
}

/// Key-value document operations the checkpointer needs from a backend.
///
/// `upsert` must replace the stored document atomically: a failure leaves
/// the previous document intact, never a partial one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the document for `doc.user_id`
    async fn upsert(&self, doc: CheckpointDocument) -> Result<()>;

    /// Find the document for a user id
    async fn find(&self, user_id: &str) -> Result<Option<CheckpointDocument>>;

    /// Delete the document for a user id; returns whether one existed
    async fn delete(&self, user_id: &str) -> Result<bool>;

    /// Distinct user ids with a stored document
    async fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory document store (for development/testing)
pub struct MemoryStore {
    documents: RwLock<HashMap<String, CheckpointDocument>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert(&self, doc: CheckpointDocument) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        documents.insert(doc.user_id.clone(), doc);
        Ok(())
    }

    async fn find(&self, user_id: &str) -> Result<Option<CheckpointDocument>> {
        let documents = self.documents.read().unwrap();
        Ok(documents.get(user_id).cloned())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let mut documents = self.documents.write().unwrap();
        Ok(documents.remove(user_id).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let documents = self.documents.read().unwrap();
        Ok(documents.keys().cloned().collect())
    }
}

/// Checkpoint store facade over a [`DocumentStore`].
///
/// This is the graceful-degradation boundary of the system: backend
/// failures are logged with the user id and collapse to empty history or
/// no-op results, so a broken store cannot abort an otherwise-successful
/// run. Callers that need retries decide for themselves; nothing is
/// retried here.
#[derive(Clone)]
pub struct Checkpointer {
    store: Arc<dyn DocumentStore>,
}

impl Checkpointer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Replace the stored history for `user_id` wholesale.
    ///
    /// Concurrent saves for one user are last-write-wins; there is no
    /// merging of diverged histories.
    pub async fn save(&self, user_id: &str, messages: &[Message]) {
        let doc = CheckpointDocument {
            user_id: user_id.to_string(),
            messages: messages.iter().map(persist).collect(),
            timestamp: Utc::now(),
        };

        match self.store.upsert(doc).await {
            Ok(()) => tracing::debug!(user_id, "checkpoint saved"),
            Err(e) => tracing::warn!(user_id, error = %e, "failed to save checkpoint"),
        }
    }

    /// Load the stored history; empty when absent or on backend failure.
    ///
    /// Entries whose role tag is not `human` or `ai` are skipped, which
    /// keeps old stores readable when new roles appear.
    pub async fn load(&self, user_id: &str) -> Vec<Message> {
        match self.store.find(user_id).await {
            Ok(Some(doc)) => {
                let messages: Vec<Message> = doc.messages.iter().filter_map(restore).collect();
                tracing::debug!(user_id, count = messages.len(), "checkpoint loaded");
                messages
            }
            Ok(None) => {
                tracing::debug!(user_id, "no checkpoint found");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "failed to load checkpoint");
                Vec::new()
            }
        }
    }

    /// Delete the checkpoint; returns whether one existed
    pub async fn clear(&self, user_id: &str) -> bool {
        match self.store.delete(user_id).await {
            Ok(existed) => {
                tracing::debug!(user_id, existed, "checkpoint cleared");
                existed
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "failed to clear checkpoint");
                false
            }
        }
    }

    /// Distinct user ids with a stored checkpoint
    pub async fn list_users(&self) -> Vec<String> {
        match self.store.keys().await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list checkpoint users");
                Vec::new()
            }
        }
    }
}

fn persist(message: &Message) -> PersistedMessage {
    PersistedMessage {
        kind: message.role().to_string(),
        data: Some(message.content().to_string()),
    }
}

fn restore(entry: &PersistedMessage) -> Option<Message> {
    let content = entry.data.clone().unwrap_or_default();
    match entry.kind.as_str() {
        "human" => Some(Message::human(content)),
        "ai" => Some(Message::ai(content)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;

    fn checkpointer() -> Checkpointer {
        Checkpointer::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_round_trip_preserves_order() {
        let cp = checkpointer();
        let messages = vec![
            Message::human("hello"),
            Message::ai("hi there"),
            Message::human("and again"),
            Message::ai("still here"),
        ];

        cp.save("u1", &messages).await;

        assert_eq!(cp.load("u1").await, messages);
    }

    #[tokio::test]
    async fn test_tool_messages_are_dropped_on_load() {
        let cp = checkpointer();
        let messages = vec![
            Message::human("what time is it"),
            Message::tool("12:00", "call_1", "datetime"),
            Message::ai("It is noon."),
        ];

        cp.save("u1", &messages).await;

        // Tool entries are persisted but not reconstructed
        assert_eq!(
            cp.load("u1").await,
            vec![Message::human("what time is it"), Message::ai("It is noon.")]
        );
    }

    #[tokio::test]
    async fn test_unknown_role_tags_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert(CheckpointDocument {
                user_id: "u1".into(),
                messages: vec![
                    PersistedMessage {
                        kind: "human".into(),
                        data: Some("hi".into()),
                    },
                    PersistedMessage {
                        kind: "system_v2".into(),
                        data: Some("future role".into()),
                    },
                    PersistedMessage {
                        kind: "ai".into(),
                        data: Some("hello".into()),
                    },
                ],
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        let cp = Checkpointer::new(store);
        assert_eq!(
            cp.load("u1").await,
            vec![Message::human("hi"), Message::ai("hello")]
        );
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let cp = checkpointer();
        let messages = vec![Message::human("hello"), Message::ai("hi")];

        cp.save("u1", &messages).await;
        cp.save("u1", &messages).await;

        assert_eq!(cp.load("u1").await, messages);
        assert_eq!(cp.list_users().await, vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn test_save_replaces_wholesale() {
        let cp = checkpointer();
        cp.save("u1", &[Message::human("first")]).await;
        cp.save("u1", &[Message::human("second"), Message::ai("ok")])
            .await;

        assert_eq!(
            cp.load("u1").await,
            vec![Message::human("second"), Message::ai("ok")]
        );
    }

    #[tokio::test]
    async fn test_clear_semantics() {
        let cp = checkpointer();
        assert!(!cp.clear("u1").await);

        cp.save("u1", &[Message::human("hi")]).await;
        assert!(cp.clear("u1").await);
        assert!(cp.load("u1").await.is_empty());
        assert!(!cp.clear("u1").await);
    }

    #[tokio::test]
    async fn test_load_missing_user_is_empty() {
        let cp = checkpointer();
        assert!(cp.load("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn test_list_users() {
        let cp = checkpointer();
        cp.save("u1", &[Message::human("a")]).await;
        cp.save("u2", &[Message::human("b")]).await;

        let mut users = cp.list_users().await;
        users.sort();
        assert_eq!(users, ["u1", "u2"]);
    }

    /// Store that fails every operation
    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn upsert(&self, _doc: CheckpointDocument) -> Result<()> {
            Err(AgentError::Persistence("store unreachable".into()))
        }

        async fn find(&self, _user_id: &str) -> Result<Option<CheckpointDocument>> {
            Err(AgentError::Persistence("store unreachable".into()))
        }

        async fn delete(&self, _user_id: &str) -> Result<bool> {
            Err(AgentError::Persistence("store unreachable".into()))
        }

        async fn keys(&self) -> Result<Vec<String>> {
            Err(AgentError::Persistence("store unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_backend_failures_degrade_gracefully() {
        let cp = Checkpointer::new(Arc::new(BrokenStore));

        cp.save("u1", &[Message::human("hi")]).await;
        assert!(cp.load("u1").await.is_empty());
        assert!(!cp.clear("u1").await);
        assert!(cp.list_users().await.is_empty());
    }
}
