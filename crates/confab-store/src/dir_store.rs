//! Directory-backed conversation store.
//!
//! Each conversation is one pretty-printed JSON file named by its id:
//!
//! ```text
//! base_dir/
//! ├── 3f8a....json
//! └── 9c21....json
//! ```
//!
//! The encoded message blob is stored verbatim inside the record; this
//! layer never decodes it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use confab_core::error::{ConfabError, Result};
use confab_core::model::{Conversation, now_timestamp};
use confab_core::store::ConversationStore;

use crate::paths::ConfabPaths;

#[derive(Debug)]
pub struct DirConversationStore {
    base_dir: PathBuf,
}

impl DirConversationStore {
    /// Creates a store at the default location
    /// (`~/.config/confab/conversations`).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be resolved
    /// or the directory cannot be created.
    pub async fn default_location() -> Result<Self> {
        let base_dir = ConfabPaths::conversations_dir()
            .map_err(|e| ConfabError::config(format!("failed to resolve store path: {e}")))?;
        Self::new(base_dir).await
    }

    /// Creates a store rooted at `base_dir`, creating the directory if
    /// needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    fn record_path(&self, conversation_id: &str) -> PathBuf {
        self.base_dir.join(format!("{conversation_id}.json"))
    }

    async fn read_record(&self, path: &Path) -> Result<Conversation> {
        let contents = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn write_record(&self, conversation: &Conversation) -> Result<()> {
        let path = self.record_path(&conversation.id);
        let contents = serde_json::to_string_pretty(conversation)?;
        fs::write(&path, contents).await?;
        Ok(())
    }

    async fn load_record(&self, conversation_id: &str) -> Result<Conversation> {
        let path = self.record_path(conversation_id);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfabError::not_found("Conversation", conversation_id));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }
}

#[async_trait]
impl ConversationStore for DirConversationStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        let mut conversations = Vec::new();
        let mut entries = fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_record(&path).await {
                Ok(conversation) if conversation.owner_id == owner_id => {
                    conversations.push(conversation);
                }
                Ok(_) => {}
                Err(err) => {
                    // One unreadable record must not hide the rest.
                    warn!(path = %path.display(), "skipping unreadable record: {err}");
                }
            }
        }
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        match self.load_record(conversation_id).await {
            Ok(conversation) => Ok(Some(conversation)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create(&self, owner_id: &str, title: &str) -> Result<Conversation> {
        let now = now_timestamp();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            messages: String::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.write_record(&conversation).await?;
        Ok(conversation)
    }

    async fn update_messages(&self, conversation_id: &str, encoded: &str) -> Result<()> {
        let mut conversation = self.load_record(conversation_id).await?;
        conversation.messages = encoded.to_string();
        conversation.updated_at = now_timestamp();
        self.write_record(&conversation).await
    }

    async fn rename(&self, conversation_id: &str, title: &str) -> Result<()> {
        let mut conversation = self.load_record(conversation_id).await?;
        conversation.title = title.to_string();
        // updated_at is deliberately untouched; list order tracks message
        // activity only.
        self.write_record(&conversation).await
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        match fs::remove_file(self.record_path(conversation_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn store() -> (TempDir, DirConversationStore) {
        let dir = TempDir::new().unwrap();
        let store = DirConversationStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (_dir, store) = store().await;

        let created = store.create("owner-1", "First chat").await.unwrap();
        let found = store.find_by_id(&created.id).await.unwrap().unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.title, "First chat");
        assert_eq!(found.owner_id, "owner-1");
        assert!(found.messages.is_empty());
    }

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let (_dir, store) = store().await;
        assert!(store.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_owner() {
        let (_dir, store) = store().await;

        store.create("alice", "A").await.unwrap();
        store.create("bob", "B").await.unwrap();

        let conversations = store.list("alice").await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].title, "A");
    }

    #[tokio::test]
    async fn test_update_messages_bumps_order() {
        let (_dir, store) = store().await;

        let first = store.create("owner-1", "First").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let _second = store.create("owner-1", "Second").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        store
            .update_messages(&first.id, r#"[{"id":"1","role":"user","content":"hi"}]"#)
            .await
            .unwrap();

        let conversations = store.list("owner-1").await.unwrap();
        assert_eq!(conversations[0].id, first.id);
        assert!(conversations[0].messages.contains("hi"));
    }

    #[tokio::test]
    async fn test_rename_does_not_bump_order() {
        let (_dir, store) = store().await;

        let first = store.create("owner-1", "First").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.create("owner-1", "Second").await.unwrap();

        store.rename(&first.id, "Renamed").await.unwrap();

        let conversations = store.list("owner-1").await.unwrap();
        assert_eq!(conversations[0].id, second.id);
        let renamed = conversations.iter().find(|c| c.id == first.id).unwrap();
        assert_eq!(renamed.title, "Renamed");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (_dir, store) = store().await;
        let err = store.update_messages("missing", "[]").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = store().await;

        let created = store.create("owner-1", "Doomed").await.unwrap();
        store.delete(&created.id).await.unwrap();
        store.delete(&created.id).await.unwrap();

        assert!(store.find_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_records() {
        let (dir, store) = store().await;

        store.create("owner-1", "Good").await.unwrap();
        tokio::fs::write(dir.path().join("junk.json"), "{broken")
            .await
            .unwrap();

        let conversations = store.list("owner-1").await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].title, "Good");
    }
}
