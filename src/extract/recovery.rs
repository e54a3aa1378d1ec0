//! Layered recovery for model output that should be a JSON task array but
//! often isn't quite.
//!
//! Strategies run in order of decreasing trust in the model's formatting:
//! parse the text as-is, then carve out the widest bracketed span, then
//! strip markdown fences and stray prose. The first strategy that yields at
//! least one usable task wins. Non-object array elements are dropped during
//! normalization, so a strategy can "succeed" at parsing and still yield
//! nothing — in that case the next strategy gets its turn.

use serde_json::Value;
use tracing::debug;

use crate::domain::{ExtractedTask, PartialTask};

type Strategy = fn(&str) -> Option<Value>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", direct_parse),
    ("bracket_span", bracket_span),
    ("strip_wrapping", strip_wrapping),
];

/// Recover tasks from raw completion text. Returns the tasks and the name
/// of the strategy that produced them, or None if nothing usable could be
/// carved out.
pub fn recover(content: &str) -> Option<(Vec<ExtractedTask>, &'static str)> {
    for (name, strategy) in STRATEGIES {
        if let Some(value) = strategy(content) {
            let tasks = normalize(value);
            if !tasks.is_empty() {
                debug!(strategy = name, count = tasks.len(), "recovered task array");
                return Some((tasks, name));
            }
        }
    }
    None
}

/// The text parses as JSON as-is.
fn direct_parse(content: &str) -> Option<Value> {
    serde_json::from_str(content).ok()
}

/// Widest `[...]` span in the text; failing that, the widest `{...}` span
/// wrapped into a single-element array.
fn bracket_span(content: &str) -> Option<Value> {
    if let Some(span) = widest_span(content, '[', ']') {
        if let Ok(value) = serde_json::from_str(span) {
            return Some(value);
        }
    }
    let span = widest_span(content, '{', '}')?;
    let object: Value = serde_json::from_str(span).ok()?;
    Some(Value::Array(vec![object]))
}

/// Strip markdown fences, then trim any prose before the first `[` and
/// after the last `]`.
fn strip_wrapping(content: &str) -> Option<Value> {
    let cleaned = content.replace("```json", "").replace("```", "");
    let mut cleaned = cleaned.trim();

    if let Some(start) = cleaned.find('[') {
        cleaned = &cleaned[start..];
    }
    if let Some(end) = cleaned.rfind(']') {
        cleaned = &cleaned[..=end];
    }

    serde_json::from_str(cleaned).ok()
}

fn widest_span(content: &str, open: char, close: char) -> Option<&str> {
    let start = content.find(open)?;
    let end = content.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&content[start..=end])
}

/// Turn a parsed JSON value into complete tasks. A lone object is treated
/// as a single-element array. Elements that are not objects are dropped.
fn normalize(value: Value) -> Vec<ExtractedTask> {
    let elements = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    elements
        .into_iter()
        .filter(|v| v.is_object())
        .filter_map(|v| serde_json::from_value::<PartialTask>(v).ok())
        .map(ExtractedTask::from_partial)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{DEFAULT_TITLE, Priority};

    #[test]
    fn test_clean_array_parses_directly() {
        let content = r#"[{"title": "Buy milk", "priority": "high"}]"#;

        let (tasks, strategy) = recover(content).unwrap();

        assert_eq!(strategy, "direct");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].priority, Priority::High);
    }

    #[test]
    fn test_prose_around_array_falls_to_bracket_span() {
        let content = r#"Here are your tasks: [{"title": "Call dentist"}] Hope this helps!"#;

        let (tasks, strategy) = recover(content).unwrap();

        assert_eq!(strategy, "bracket_span");
        assert_eq!(tasks[0].title, "Call dentist");
    }

    #[test]
    fn test_lone_object_is_wrapped_into_array() {
        let content = r#"Sure! {"title": "Water plants", "category": "personal"}"#;

        let (tasks, strategy) = recover(content).unwrap();

        assert_eq!(strategy, "bracket_span");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Water plants");
    }

    #[test]
    fn test_fenced_block_falls_to_strip_wrapping() {
        // The fences contain brackets the span strategy trips on
        let content = "```json\n[{\"title\": \"Pack bags\"}]\n```\nNote: ]";

        let (tasks, _) = recover(content).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Pack bags");
    }

    #[test]
    fn test_unusable_text_recovers_nothing() {
        assert!(recover("I could not find any tasks in that recording.").is_none());
        assert!(recover("").is_none());
    }

    #[test]
    fn test_non_object_elements_are_dropped() {
        let content = r#"[{"title": "Real task"}, "just a string", 42, null]"#;

        let (tasks, _) = recover(content).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Real task");
    }

    #[test]
    fn test_array_of_only_non_objects_falls_through_all_strategies() {
        // Parses fine at every tier but never yields a task
        assert!(recover(r#"["a", "b", 3]"#).is_none());
    }

    #[test]
    fn test_recovered_tasks_are_backfilled() {
        let content = r#"[{"title": "Jog"}, {}]"#;

        let (tasks, _) = recover(content).unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].description, "Jog");
        assert_eq!(tasks[1].title, DEFAULT_TITLE);
        assert_eq!(tasks[1].date, "today");
    }

    #[test]
    fn test_nested_arrays_inside_objects_survive_span_carving() {
        let content = r#"Result: [{"title": "Shop", "description": "eggs"}] done"#;

        let (tasks, _) = recover(content).unwrap();
        assert_eq!(tasks[0].description, "eggs");
    }
}
