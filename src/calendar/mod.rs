//! Materializing extracted tasks into calendar targets.
//!
//! A task's soft date ("today", "tomorrow", ISO date) is resolved into a
//! concrete start/end pair at dispatch time. Dispatch is per-task: one
//! failed task never blocks the rest of the batch, failures are collected
//! into the report instead.

pub mod google;
pub mod links;
pub mod store;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{info, warn};

use crate::domain::ExtractedTask;
use crate::error::PipelineError;

/// One hour, the default duration for timed events.
const DEFAULT_DURATION: Duration = Duration::hours(1);

/// A task resolved into a concrete calendar slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub all_day: bool,
}

impl CalendarEvent {
    /// Resolve a task against a reference instant, usually the local now.
    /// Taking `now` as an argument keeps resolution deterministic and
    /// testable.
    pub fn from_task_at(task: &ExtractedTask, now: NaiveDateTime) -> Self {
        let date = resolve_date(&task.date, now.date());
        let time = task.time.as_deref().and_then(resolve_time);

        let (start, end, all_day) = match (date, time) {
            (Some(d), Some(t)) => {
                let start = d.and_time(t);
                (start, start + DEFAULT_DURATION, false)
            }
            (Some(d), None) => {
                let start = d.and_time(NaiveTime::MIN);
                (start, start + Duration::days(1), true)
            }
            // Unresolvable date: fall back to a one-hour slot starting now
            (None, _) => (now, now + DEFAULT_DURATION, false),
        };

        Self {
            summary: task.title.clone(),
            description: format!(
                "{}\n\nPriority: {}\nCategory: {}",
                task.description, task.priority, task.category
            ),
            start,
            end,
            all_day,
        }
    }
}

/// Resolve a soft date string relative to a reference date.
fn resolve_date(date: &str, today: NaiveDate) -> Option<NaiveDate> {
    match date.trim().to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        other => {
            let mut parts = other.splitn(3, '-');
            let year: i32 = parts.next()?.trim().parse().ok()?;
            let month: u32 = parts.next()?.trim().parse().ok()?;
            let day: u32 = parts.next()?.trim().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
    }
}

/// Parse `HH:MM` 24-hour time. Anything else means all-day.
fn resolve_time(time: &str) -> Option<NaiveTime> {
    let mut parts = time.trim().splitn(2, ':');
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = parts.next()?.trim().parse().ok()?;
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// A destination tasks can be dispatched to.
#[async_trait]
pub trait CalendarTarget: Send + Sync {
    fn name(&self) -> &str;

    /// Dispatch one task. The returned string is a human-facing receipt:
    /// an id, a link, or the generated link sheet.
    async fn dispatch(
        &self,
        task: &ExtractedTask,
        event: &CalendarEvent,
    ) -> anyhow::Result<String>;
}

/// Outcome of dispatching a batch of tasks to one target.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// (task index, receipt) for each task that landed.
    pub succeeded: Vec<(usize, String)>,
    /// One `CalendarDispatchFailed` per task that did not.
    pub failed: Vec<PipelineError>,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Dispatch the given tasks to a target, continuing past per-task failures.
pub async fn dispatch_selected(
    target: &dyn CalendarTarget,
    selected: &[(usize, &ExtractedTask)],
    now: NaiveDateTime,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    for &(index, task) in selected {
        let event = CalendarEvent::from_task_at(task, now);
        match target.dispatch(task, &event).await {
            Ok(receipt) => {
                info!(target = target.name(), index, title = %task.title, "task dispatched");
                report.succeeded.push((index, receipt));
            }
            Err(e) => {
                let err = PipelineError::CalendarDispatchFailed {
                    task_index: index,
                    reason: format!("{e:#}"),
                };
                warn!(target = target.name(), "{err}");
                report.failed.push(err);
            }
        }
    }

    report
}
