//! The extracted task record and its default-construction helpers.
//!
//! `ExtractedTask` is the central record of the pipeline: every field is
//! present and valid once extraction completes. `PartialTask` is what the
//! language model actually gives us — any subset of the fields, possibly
//! with the wrong JSON types — and `ExtractedTask::from_partial` is the
//! single place where missing or invalid fields are backfilled.

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder title when the model omits one.
pub const DEFAULT_TITLE: &str = "Untitled task";

/// Placeholder description when both description and title are missing.
pub const DEFAULT_DESCRIPTION: &str = "No description";

/// Literal date token meaning "the current local date".
pub const DATE_TODAY: &str = "today";

/// A fully-formed task or event extracted from a transcript.
///
/// Invariant: every field is present and non-null. The extraction engine
/// never hands a task with missing fields to the materializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTask {
    /// Short title, never empty.
    pub title: String,

    /// Whether this is an actionable task or a scheduled event.
    #[serde(rename = "type")]
    pub kind: TaskKind,

    /// Longer description; falls back to the title if the model omits it.
    pub description: String,

    /// Either the literal `"today"` / `"tomorrow"`, or an ISO `YYYY-MM-DD`
    /// string. Resolution to an actual date happens at materialization time.
    pub date: String,

    /// `HH:MM` 24-hour time, or None for all-day items.
    pub time: Option<String>,

    pub priority: Priority,

    pub category: Category,
}

impl ExtractedTask {
    /// Backfill a partially-formed model output into a complete task.
    ///
    /// Mirrors the field-by-field fallback chain of the extraction contract:
    /// description falls back to the original title, then to a placeholder;
    /// unknown enum strings fall back to their defaults.
    pub fn from_partial(partial: PartialTask) -> Self {
        let title_raw = partial.title.filter(|s| !s.trim().is_empty());
        let description = partial
            .description
            .filter(|s| !s.trim().is_empty())
            .or_else(|| title_raw.clone())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        Self {
            title: title_raw.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            kind: partial
                .kind
                .as_deref()
                .map(TaskKind::parse_or_default)
                .unwrap_or_default(),
            description,
            date: partial
                .date
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DATE_TODAY.to_string()),
            time: partial.time.filter(|s| !s.trim().is_empty()),
            priority: partial
                .priority
                .as_deref()
                .map(Priority::parse_or_default)
                .unwrap_or_default(),
            category: partial
                .category
                .as_deref()
                .map(Category::parse_or_default)
                .unwrap_or_default(),
        }
    }

    /// The guaranteed-fallback task: the raw transcript becomes the
    /// description, every other field takes its default.
    pub fn fallback_from_transcript(transcript: &str) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            kind: TaskKind::default(),
            description: transcript.to_string(),
            date: DATE_TODAY.to_string(),
            time: None,
            priority: Priority::default(),
            category: Category::default(),
        }
    }
}

/// Task vs event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Task,
    Event,
}

impl TaskKind {
    fn parse_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "event" => Self::Event,
            _ => Self::Task,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Event => write!(f, "event"),
        }
    }
}

/// Urgency of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    fn parse_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Life area a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Personal,
    Health,
    Shopping,
    Travel,
    #[default]
    Other,
}

impl Category {
    fn parse_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "work" => Self::Work,
            "personal" => Self::Personal,
            "health" => Self::Health,
            "shopping" => Self::Shopping,
            "travel" => Self::Travel,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Work => write!(f, "work"),
            Self::Personal => write!(f, "personal"),
            Self::Health => write!(f, "health"),
            Self::Shopping => write!(f, "shopping"),
            Self::Travel => write!(f, "travel"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A task as the model actually returned it: any subset of the fields,
/// possibly with non-string JSON values where strings were asked for.
///
/// Deserialization is deliberately lenient — a number where a string was
/// expected is stringified, anything else becomes None — so a single sloppy
/// field never discards an otherwise usable task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialTask {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,

    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub time: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub priority: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
}

/// Accept strings as-is, stringify numbers, map everything else to None.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_partial_backfills_all_defaults() {
        let task = ExtractedTask::from_partial(PartialTask::default());

        assert_eq!(task.title, DEFAULT_TITLE);
        assert_eq!(task.kind, TaskKind::Task);
        assert_eq!(task.description, DEFAULT_DESCRIPTION);
        assert_eq!(task.date, "today");
        assert_eq!(task.time, None);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, Category::Other);
    }

    #[test]
    fn test_from_partial_description_falls_back_to_title() {
        let partial = PartialTask {
            title: Some("Buy milk".to_string()),
            ..Default::default()
        };

        let task = ExtractedTask::from_partial(partial);

        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "Buy milk");
    }

    #[test]
    fn test_from_partial_preserves_provided_fields() {
        let partial: PartialTask = serde_json::from_str(
            r#"{
                "title": "Dentist",
                "type": "event",
                "description": "Checkup appointment",
                "date": "2025-03-10",
                "time": "14:30",
                "priority": "high",
                "category": "health"
            }"#,
        )
        .unwrap();

        let task = ExtractedTask::from_partial(partial);

        assert_eq!(task.title, "Dentist");
        assert_eq!(task.kind, TaskKind::Event);
        assert_eq!(task.description, "Checkup appointment");
        assert_eq!(task.date, "2025-03-10");
        assert_eq!(task.time, Some("14:30".to_string()));
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.category, Category::Health);
    }

    #[test]
    fn test_unknown_enum_strings_fall_back_to_defaults() {
        let partial: PartialTask = serde_json::from_str(
            r#"{"title": "x", "type": "reminder", "priority": "urgent", "category": "misc"}"#,
        )
        .unwrap();

        let task = ExtractedTask::from_partial(partial);

        assert_eq!(task.kind, TaskKind::Task);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, Category::Other);
    }

    #[test]
    fn test_lenient_deserialization_tolerates_wrong_types() {
        // time as JSON null, priority as a number, title as a bool
        let partial: PartialTask = serde_json::from_str(
            r#"{"title": true, "time": null, "priority": 3, "date": "tomorrow"}"#,
        )
        .unwrap();

        let task = ExtractedTask::from_partial(partial);

        assert_eq!(task.title, DEFAULT_TITLE);
        assert_eq!(task.time, None);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.date, "tomorrow");
    }

    #[test]
    fn test_fallback_from_transcript() {
        let task = ExtractedTask::fallback_from_transcript("call mom tonight");

        assert_eq!(task.description, "call mom tonight");
        assert_eq!(task.title, DEFAULT_TITLE);
        assert_eq!(task.date, "today");
        assert_eq!(task.time, None);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, Category::Other);
    }

    #[test]
    fn test_task_serialization_round_trip() {
        let task = ExtractedTask {
            title: "Standup".to_string(),
            kind: TaskKind::Event,
            description: "Daily standup".to_string(),
            date: "today".to_string(),
            time: Some("09:00".to_string()),
            priority: Priority::Low,
            category: Category::Work,
        };

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""type":"event""#));
        assert!(json.contains(r#""priority":"low""#));

        let parsed: ExtractedTask = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, task);
    }
}
