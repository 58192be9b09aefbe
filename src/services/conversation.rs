//! Conversation stores - per-session history and bot settings

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::agent::HistoryEntry;
use crate::config::BotConfiguration;
use crate::Result;

use super::ConversationStore;

/// File-based store: one JSONL file per session under `conversations/`,
/// bot settings in `bot_settings.json`.
pub struct FileConversationStore {
    workspace: PathBuf,
}

impl FileConversationStore {
    pub fn new(workspace: &Path) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
        }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_') { c } else { '_' })
            .collect();
        self.workspace.join("conversations").join(format!("{}.jsonl", safe))
    }

    fn settings_path(&self) -> PathBuf {
        self.workspace.join("bot_settings.json")
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(vec![]);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let mut entries = Vec::new();
        for (i, line) in content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping malformed history line {} in {:?}: {}", i + 1, path, e),
            }
        }

        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    async fn bot_config(&self) -> Result<BotConfiguration> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(BotConfiguration::default());
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn append(&self, session_id: &str, entry: HistoryEntry) -> Result<()> {
        let path = self.session_path(session_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

/// In-memory store for testing
pub struct InMemoryConversationStore {
    config: BotConfiguration,
    sessions: Mutex<HashMap<String, Vec<HistoryEntry>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::with_config(BotConfiguration::default())
    }

    pub fn with_config(config: BotConfiguration) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a session with prior turns.
    pub fn with_history(mut self, session_id: &str, entries: Vec<HistoryEntry>) -> Self {
        self.sessions.get_mut().insert(session_id.to_string(), entries);
        self
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let sessions = self.sessions.lock().await;
        let entries = sessions.get(session_id).map(Vec::as_slice).unwrap_or_default();
        let skip = entries.len().saturating_sub(limit);
        Ok(entries[skip..].to_vec())
    }

    async fn bot_config(&self) -> Result<BotConfiguration> {
        Ok(self.config.clone())
    }

    async fn append(&self, session_id: &str, entry: HistoryEntry) -> Result<()> {
        self.sessions
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_round_trip_and_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConversationStore::new(dir.path());

        for i in 0..5 {
            store.append("+56912345678", HistoryEntry::user(format!("msg {}", i))).await.unwrap();
        }

        let history = store.history("+56912345678", 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "msg 2");
        assert_eq!(history[2].content, "msg 4");

        assert!(store.history("unknown", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConversationStore::new(dir.path());
        store.append("s1", HistoryEntry::user("hello")).await.unwrap();

        let path = store.session_path("s1");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{not json}\n");
        std::fs::write(&path, content).unwrap();
        store.append("s1", HistoryEntry::model("hi!")).await.unwrap();

        let history = store.history("s1", 10).await.unwrap();
        assert_eq!(history, vec![HistoryEntry::user("hello"), HistoryEntry::model("hi!")]);
    }

    #[tokio::test]
    async fn test_file_store_settings_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConversationStore::new(dir.path());
        assert_eq!(store.bot_config().await.unwrap().max_tool_turns, 5);

        std::fs::write(dir.path().join("bot_settings.json"), r#"{"max_tool_turns": 2}"#).unwrap();
        assert_eq!(store.bot_config().await.unwrap().max_tool_turns, 2);
    }

    #[test]
    fn test_session_path_is_sanitized() {
        let store = FileConversationStore::new(Path::new("/tmp/ws"));
        let path = store.session_path("../etc/passwd");
        assert_eq!(path.file_name().unwrap(), "___etc_passwd.jsonl");
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryConversationStore::new()
            .with_history("s1", vec![HistoryEntry::user("a"), HistoryEntry::model("b")]);
        store.append("s1", HistoryEntry::user("c")).await.unwrap();

        let history = store.history("s1", 2).await.unwrap();
        assert_eq!(history, vec![HistoryEntry::model("b"), HistoryEntry::user("c")]);
    }
}
