//! Google Calendar target. Inserts events into the user's primary calendar
//! with a bearer token the caller already obtained.

use async_trait::async_trait;
use chrono::{Local, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::calendar::{CalendarEvent, CalendarTarget};
use crate::domain::{ExtractedTask, Priority};

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

/// Reminder lead times, in minutes.
const POPUP_REMINDER_MINUTES: u32 = 15;
const EMAIL_REMINDER_MINUTES: u32 = 60;

/// Google Calendar color ids by priority: red, yellow, green.
fn color_id(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "11",
        Priority::Medium => "5",
        Priority::Low => "2",
    }
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: String,
    #[serde(rename = "htmlLink", default)]
    html_link: Option<String>,
}

pub struct GoogleCalendarClient {
    client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
        }
    }

    fn event_body(task: &ExtractedTask, event: &CalendarEvent) -> serde_json::Value {
        let (start, end) = if event.all_day {
            (
                json!({ "date": event.start.format("%Y-%m-%d").to_string() }),
                json!({ "date": event.end.format("%Y-%m-%d").to_string() }),
            )
        } else {
            (
                json!({ "dateTime": to_rfc3339_local(event.start) }),
                json!({ "dateTime": to_rfc3339_local(event.end) }),
            )
        };

        json!({
            "summary": event.summary,
            "description": event.description,
            "start": start,
            "end": end,
            "colorId": color_id(task.priority),
            "reminders": {
                "useDefault": false,
                "overrides": [
                    { "method": "popup", "minutes": POPUP_REMINDER_MINUTES },
                    { "method": "email", "minutes": EMAIL_REMINDER_MINUTES },
                ],
            },
        })
    }
}

/// Interpret a naive local timestamp in the system timezone. Ambiguous or
/// skipped times around DST transitions fall back to UTC.
fn to_rfc3339_local(naive: chrono::NaiveDateTime) -> String {
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.to_rfc3339(),
        None => Utc.from_utc_datetime(&naive).to_rfc3339(),
    }
}

#[async_trait]
impl CalendarTarget for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google"
    }

    async fn dispatch(
        &self,
        task: &ExtractedTask,
        event: &CalendarEvent,
    ) -> anyhow::Result<String> {
        let body = Self::event_body(task, event);
        debug!(summary = %event.summary, all_day = event.all_day, "inserting calendar event");

        let response = self
            .client
            .post(EVENTS_URL)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("calendar insert failed: {status}: {text}");
        }

        let inserted: InsertedEvent = serde_json::from_str(&text)?;
        Ok(inserted.html_link.unwrap_or(inserted.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{Category, TaskKind};
    use chrono::NaiveDate;

    fn task(priority: Priority) -> ExtractedTask {
        ExtractedTask {
            title: "Dentist".to_string(),
            kind: TaskKind::Event,
            description: "Checkup".to_string(),
            date: "2025-03-10".to_string(),
            time: Some("14:30".to_string()),
            priority,
            category: Category::Health,
        }
    }

    fn now() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_color_ids_follow_priority() {
        assert_eq!(color_id(Priority::High), "11");
        assert_eq!(color_id(Priority::Medium), "5");
        assert_eq!(color_id(Priority::Low), "2");
    }

    #[test]
    fn test_timed_event_body_uses_datetime() {
        let t = task(Priority::High);
        let event = CalendarEvent::from_task_at(&t, now());

        let body = GoogleCalendarClient::event_body(&t, &event);

        assert_eq!(body["summary"], "Dentist");
        assert_eq!(body["colorId"], "11");
        assert!(body["start"]["dateTime"]
            .as_str()
            .unwrap()
            .starts_with("2025-03-10T14:30:00"));
        assert!(body["start"].get("date").is_none());
    }

    #[test]
    fn test_all_day_event_body_uses_date_span() {
        let mut t = task(Priority::Low);
        t.time = None;
        let event = CalendarEvent::from_task_at(&t, now());

        let body = GoogleCalendarClient::event_body(&t, &event);

        assert_eq!(body["start"]["date"], "2025-03-10");
        assert_eq!(body["end"]["date"], "2025-03-11");
        assert!(body["start"].get("dateTime").is_none());
    }

    #[test]
    fn test_reminder_overrides() {
        let t = task(Priority::Medium);
        let event = CalendarEvent::from_task_at(&t, now());

        let body = GoogleCalendarClient::event_body(&t, &event);

        assert_eq!(body["reminders"]["useDefault"], false);
        let overrides = body["reminders"]["overrides"].as_array().unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[0]["method"], "popup");
        assert_eq!(overrides[0]["minutes"], 15);
        assert_eq!(overrides[1]["method"], "email");
        assert_eq!(overrides[1]["minutes"], 60);
    }

    #[test]
    fn test_inserted_event_parsing() {
        let parsed: InsertedEvent = serde_json::from_str(
            r#"{"id": "abc123", "htmlLink": "https://calendar.google.com/event?eid=abc"}"#,
        )
        .unwrap();
        assert_eq!(parsed.id, "abc123");
        assert!(parsed.html_link.is_some());
    }
}
