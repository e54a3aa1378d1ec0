//! Explicit session state threaded through the pipeline stages.
//!
//! Each stage consumes the current session and returns a new value instead
//! of mutating shared state. The session is persisted as a single JSON file
//! under the voiceplan home directory so consecutive CLI invocations operate
//! on the same run: record → transcribe → extract → select → add.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::ExtractedTask;
use super::transcript::Transcript;

/// The set of task indices the user has marked for materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSelection(BTreeSet<usize>);

impl TaskSelection {
    pub fn all(task_count: usize) -> Self {
        Self((0..task_count).collect())
    }

    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// Toggle membership of one index. Out-of-range indices are rejected.
    pub fn toggle(&mut self, index: usize, task_count: usize) -> bool {
        if index >= task_count {
            return false;
        }
        if !self.0.remove(&index) {
            self.0.insert(index);
        }
        true
    }

    /// Drop one index from the selection.
    pub fn deselect(&mut self, index: usize) -> bool {
        self.0.remove(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// State of one voice-planning session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,

    /// Language tag the user chose for this session.
    pub language: String,

    /// Path to the recorded audio, if a recording exists and has not yet
    /// been transcribed. Cleared once transcription succeeds — raw audio is
    /// not retained past that point.
    pub audio_path: Option<PathBuf>,

    pub transcript: Option<Transcript>,

    pub tasks: Vec<ExtractedTask>,

    pub selection: TaskSelection,
}

impl Session {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            language: language.into(),
            audio_path: None,
            transcript: None,
            tasks: Vec::new(),
            selection: TaskSelection::none(),
        }
    }

    /// A new recording starts a fresh downstream state: transcript, tasks
    /// and selection from any previous run are dropped.
    pub fn with_capture(mut self, audio_path: PathBuf) -> Self {
        self.audio_path = Some(audio_path);
        self.transcript = None;
        self.tasks = Vec::new();
        self.selection = TaskSelection::none();
        self
    }

    /// Record a successful transcription and drop the raw audio reference.
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.audio_path = None;
        self.transcript = Some(transcript);
        self.tasks = Vec::new();
        self.selection = TaskSelection::none();
        self
    }

    /// Record extraction output. All tasks start selected, matching the
    /// behavior of the extraction stage's consumer.
    pub fn with_tasks(mut self, tasks: Vec<ExtractedTask>) -> Self {
        self.selection = TaskSelection::all(tasks.len());
        self.tasks = tasks;
        self
    }

    /// Reset after successful materialization: ready for a new recording.
    pub fn cleared(self) -> Self {
        Self::new(self.language)
    }

    /// The selected tasks, paired with their indices in the task list.
    pub fn selected_tasks(&self) -> Vec<(usize, &ExtractedTask)> {
        self.selection
            .indices()
            .filter_map(|i| self.tasks.get(i).map(|t| (i, t)))
            .collect()
    }

    /// Load the persisted session, if one exists.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
        Ok(Some(session))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write session file: {}", path.display()))?;
        Ok(())
    }
}
