//! Local task store: append-only JSONL with state derived from replay.
//!
//! Adding the same task for the same owner twice is a no-op; identity is a
//! content hash over the task record, not an insertion counter.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::calendar::{CalendarEvent, CalendarTarget};
use crate::domain::ExtractedTask;
use crate::error::Result;

/// One stored task line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTask {
    /// Content hash (SHA256, 12 chars) over the task and owner.
    pub id: String,

    pub owner: String,

    pub status: String,

    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub task: ExtractedTask,
}

pub struct TaskStore {
    path: PathBuf,
    owner: String,
}

impl TaskStore {
    pub fn new(path: PathBuf, owner: impl Into<String>) -> Self {
        Self {
            path,
            owner: owner.into(),
        }
    }

    /// Add a task. Returns the stored id; re-adding an identical task for
    /// the same owner returns the existing id without writing.
    pub async fn add(&self, task: &ExtractedTask) -> Result<String> {
        let id = task_id(task, &self.owner)?;

        let existing = self.replay().await?;
        if existing.iter().any(|t| t.id == id) {
            return Ok(id);
        }

        let record = StoredTask {
            id: id.clone(),
            owner: self.owner.clone(),
            status: "pending".to_string(),
            created_at: Utc::now(),
            task: task.clone(),
        };
        self.append(&record).await?;

        Ok(id)
    }

    /// Replay the log into current state, oldest first.
    pub async fn replay(&self) -> Result<Vec<StoredTask>> {
        let mut tasks = Vec::new();

        if !self.path.exists() {
            return Ok(tasks);
        }

        let file = File::open(&self.path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredTask = serde_json::from_str(&line)?;
            tasks.push(record);
        }

        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn append(&self, record: &StoredTask) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let json = serde_json::to_string(record)?;
        file.write_all(format!("{}\n", json).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

/// Content hash identifying one (task, owner) pair.
fn task_id(task: &ExtractedTask, owner: &str) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(task)?);
    hasher.update(owner.as_bytes());
    let digest = hasher.finalize();
    Ok(hex::encode(digest)[..12].to_string())
}

#[async_trait]
impl CalendarTarget for TaskStore {
    fn name(&self) -> &str {
        "store"
    }

    async fn dispatch(
        &self,
        task: &ExtractedTask,
        _event: &CalendarEvent,
    ) -> anyhow::Result<String> {
        let id = self.add(task).await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{Category, Priority, TaskKind};
    use tempfile::TempDir;

    fn sample_task(title: &str) -> ExtractedTask {
        ExtractedTask {
            title: title.to_string(),
            kind: TaskKind::Task,
            description: title.to_string(),
            date: "today".to_string(),
            time: None,
            priority: Priority::Medium,
            category: Category::Other,
        }
    }

    fn create_test_store(temp: &TempDir) -> TaskStore {
        TaskStore::new(temp.path().join("tasks.jsonl"), "tester")
    }

    #[tokio::test]
    async fn test_add_and_replay() {
        let temp = TempDir::new().unwrap();
        let store = create_test_store(&temp);

        store.add(&sample_task("Buy milk")).await.unwrap();
        store.add(&sample_task("Call dentist")).await.unwrap();

        let tasks = store.replay().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].task.title, "Buy milk");
        assert_eq!(tasks[0].status, "pending");
        assert_eq!(tasks[0].owner, "tester");
    }

    #[tokio::test]
    async fn test_idempotent_add() {
        let temp = TempDir::new().unwrap();
        let store = create_test_store(&temp);

        let id1 = store.add(&sample_task("Buy milk")).await.unwrap();
        let id2 = store.add(&sample_task("Buy milk")).await.unwrap();

        assert_eq!(id1, id2);
        assert_eq!(store.replay().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_different_owners_get_different_ids() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.jsonl");

        let store_a = TaskStore::new(path.clone(), "alice");
        let store_b = TaskStore::new(path, "bob");

        let id_a = store_a.add(&sample_task("Buy milk")).await.unwrap();
        let id_b = store_b.add(&sample_task("Buy milk")).await.unwrap();

        assert_ne!(id_a, id_b);
        assert_eq!(store_a.replay().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replay_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = create_test_store(&temp);

        assert!(store.replay().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_line_flattens_task_fields() {
        let temp = TempDir::new().unwrap();
        let store = create_test_store(&temp);

        store.add(&sample_task("Buy milk")).await.unwrap();

        let content = tokio::fs::read_to_string(temp.path().join("tasks.jsonl"))
            .await
            .unwrap();
        let line: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(line["title"], "Buy milk");
        assert_eq!(line["status"], "pending");
        assert_eq!(line["type"], "task");
    }
}
