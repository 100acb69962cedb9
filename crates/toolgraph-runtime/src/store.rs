//! JSON File Document Store
//!
//! One checkpoint document per user, stored as a JSON file under a data
//! directory. Replacement is atomic: each save writes its own temporary
//! file and renames it into place, so a failed or racing write leaves a
//! complete document behind, never a torn one.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use toolgraph_core::{
    checkpoint::{CheckpointDocument, DocumentStore},
    error::{AgentError, Result},
};

/// File-backed document store.
///
/// File names percent-encode the user id, so distinct ids never share a
/// file. The exact id is also kept inside the document, which is what
/// `keys` reports.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(user_id)))
    }
}

/// Encode a user id into a file name. Alphanumerics and `-` `_` `.` pass
/// through; every other byte, `%` included, becomes `%XX`, so the mapping
/// is injective.
fn encode_key(user_id: &str) -> String {
    let mut out = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn write_atomic(dir: &Path, path: &Path, doc: &CheckpointDocument) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(doc)?;

    // Each save gets its own temp file; concurrent saves for one user
    // race only on the rename, which replaces whole documents.
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        AgentError::Persistence(format!("failed to create temp file in {}: {e}", dir.display()))
    })?;
    tmp.write_all(&bytes)
        .map_err(|e| AgentError::Persistence(format!("failed to write {}: {e}", tmp.path().display())))?;
    tmp.persist(path)
        .map_err(|e| AgentError::Persistence(format!("failed to replace {}: {e}", path.display())))?;
    Ok(())
}

fn read_doc(path: &Path) -> Result<Option<CheckpointDocument>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AgentError::Persistence(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let doc = serde_json::from_slice(&bytes).map_err(|e| {
        AgentError::Persistence(format!("malformed checkpoint {}: {e}", path.display()))
    })?;
    Ok(Some(doc))
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn upsert(&self, doc: CheckpointDocument) -> Result<()> {
        let dir = self.dir.clone();
        let path = self.path_for(&doc.user_id);
        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &doc))
            .await
            .map_err(|e| AgentError::Persistence(format!("store task failed: {e}")))?
    }

    async fn find(&self, user_id: &str) -> Result<Option<CheckpointDocument>> {
        let path = self.path_for(user_id);
        tokio::task::spawn_blocking(move || read_doc(&path))
            .await
            .map_err(|e| AgentError::Persistence(format!("store task failed: {e}")))?
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let path = self.path_for(user_id);
        tokio::task::spawn_blocking(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AgentError::Persistence(format!(
                "failed to delete {}: {e}",
                path.display()
            ))),
        })
        .await
        .map_err(|e| AgentError::Persistence(format!("store task failed: {e}")))?
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || {
            let entries = std::fs::read_dir(&dir).map_err(|e| {
                AgentError::Persistence(format!("failed to list {}: {e}", dir.display()))
            })?;

            let mut users = Vec::new();
            for entry in entries {
                let path = entry
                    .map_err(|e| {
                        AgentError::Persistence(format!("failed to list {}: {e}", dir.display()))
                    })?
                    .path();

                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }

                // The document carries the exact user id
                match read_doc(&path) {
                    Ok(Some(doc)) => users.push(doc.user_id),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable checkpoint"),
                }
            }
            Ok(users)
        })
        .await
        .map_err(|e| AgentError::Persistence(format!("store task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use toolgraph_core::{Checkpointer, Message};

    fn store() -> (tempfile::TempDir, Arc<JsonFileStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()).unwrap());
        (dir, store)
    }

    #[tokio::test]
    async fn test_round_trip_through_files() {
        let (_dir, store) = store();
        let cp = Checkpointer::new(store);
        let messages = vec![Message::human("hello"), Message::ai("hi there")];

        cp.save("u1", &messages).await;
        assert_eq!(cp.load("u1").await, messages);
    }

    #[tokio::test]
    async fn test_save_replaces_existing_file() {
        let (_dir, store) = store();
        let cp = Checkpointer::new(store);

        cp.save("u1", &[Message::human("first")]).await;
        cp.save("u1", &[Message::human("second"), Message::ai("ok")])
            .await;

        assert_eq!(
            cp.load("u1").await,
            vec![Message::human("second"), Message::ai("ok")]
        );
    }

    #[tokio::test]
    async fn test_ids_differing_in_special_chars_do_not_collide() {
        let (_dir, store) = store();
        let cp = Checkpointer::new(store);

        // "a/b" and "a_b" must map to distinct files
        cp.save("a/b", &[Message::human("slash")]).await;
        cp.save("a_b", &[Message::human("underscore")]).await;

        assert_eq!(cp.load("a/b").await, vec![Message::human("slash")]);
        assert_eq!(cp.load("a_b").await, vec![Message::human("underscore")]);
    }

    #[test]
    fn test_encode_key_is_injective_on_escape_char() {
        // "%2F" the literal must not collide with the encoding of "/"
        assert_ne!(encode_key("a%2Fb"), encode_key("a/b"));
        assert_eq!(encode_key("user-1_a.b"), "user-1_a.b");
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let (_dir, store) = store();

        assert!(!store.delete("u1").await.unwrap());

        let cp = Checkpointer::new(store.clone());
        cp.save("u1", &[Message::human("hi")]).await;

        assert!(store.delete("u1").await.unwrap());
        assert!(store.find("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_return_original_user_ids() {
        let (_dir, store) = store();
        let cp = Checkpointer::new(store.clone());

        // The slash is encoded in the file name but not in the document
        cp.save("tenant/42", &[Message::human("hi")]).await;
        cp.save("u2", &[Message::human("hello")]).await;

        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, ["tenant/42", "u2"]);
    }

    #[tokio::test]
    async fn test_concurrent_saves_leave_a_parseable_document() {
        let (_dir, store) = store();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let cp = Checkpointer::new(store.clone());
                tokio::spawn(async move {
                    cp.save("u1", &[Message::human(format!("save {i}"))]).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // Whichever save won, the stored document is a complete one
        let doc = store.find("u1").await.unwrap().unwrap();
        assert_eq!(doc.messages.len(), 1);
        assert!(doc.messages[0].data.as_deref().unwrap().starts_with("save "));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let (dir, store) = store();
        let cp = Checkpointer::new(store);
        cp.save("u1", &[Message::human("hi")]).await;

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["u1.json"]);
    }
}
