//! Provider-agnostic calendar links. No network calls, no credentials:
//! the user opens the link and their calendar UI takes it from there.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::calendar::{CalendarEvent, CalendarTarget};
use crate::domain::ExtractedTask;

/// Compact UTC stamp used by the Google render URL and the ICS payload.
fn compact_stamp(dt: NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// ISO stamp used by the Outlook deeplink.
fn iso_stamp(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// The three links generated for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarLinks {
    pub google: String,
    pub outlook: String,
    pub ics: String,
}

impl CalendarLinks {
    pub fn for_event(event: &CalendarEvent) -> Self {
        Self {
            google: google_link(event),
            outlook: outlook_link(event),
            ics: ics_data_uri(event),
        }
    }
}

fn google_link(event: &CalendarEvent) -> String {
    format!(
        "https://calendar.google.com/calendar/render?action=TEMPLATE&text={}&details={}&dates={}/{}",
        urlencoding::encode(&event.summary),
        urlencoding::encode(&event.description),
        compact_stamp(event.start),
        compact_stamp(event.end),
    )
}

fn outlook_link(event: &CalendarEvent) -> String {
    format!(
        "https://outlook.live.com/calendar/0/deeplink/compose?subject={}&body={}&startdt={}&enddt={}",
        urlencoding::encode(&event.summary),
        urlencoding::encode(&event.description),
        iso_stamp(event.start),
        iso_stamp(event.end),
    )
}

/// Inline ICS document as a data URI, openable by Apple Calendar and most
/// desktop calendar apps.
fn ics_data_uri(event: &CalendarEvent) -> String {
    let description = event.description.replace('\n', "\\n");
    let ics = format!(
        "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VEVENT\nDTSTART:{}\nDTEND:{}\nSUMMARY:{}\nDESCRIPTION:{}\nEND:VEVENT\nEND:VCALENDAR",
        compact_stamp(event.start),
        compact_stamp(event.end),
        event.summary,
        description,
    );
    format!("data:text/calendar;charset=utf8,{}", ics)
}

/// A target that "dispatches" by handing back the link sheet.
pub struct LinkSheet;

#[async_trait]
impl CalendarTarget for LinkSheet {
    fn name(&self) -> &str {
        "links"
    }

    async fn dispatch(
        &self,
        _task: &ExtractedTask,
        event: &CalendarEvent,
    ) -> anyhow::Result<String> {
        let links = CalendarLinks::for_event(event);
        Ok(format!(
            "Google:  {}\nOutlook: {}\nICS:     {}",
            links.google, links.outlook, links.ics
        ))
    }
}
