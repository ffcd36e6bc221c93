//! Output formatting for the daily report.
//!
//! This module renders a [`DailyEventReport`] for the outputs the CLI offers:
//! - **Text**: human-readable listing grouped by calendar
//! - **JSON**: machine-readable list of `{calendar, events}` groups, also used
//!   for the on-disk snapshot
//!
//! # Example
//!
//! ```rust
//! use chrono::{NaiveDate, Utc};
//! use todaycal_core::format::{FormatOptions, ReportFormatter};
//! use todaycal_core::{DailyEventReport, DayWindow};
//!
//! let window = DayWindow::for_date(NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(), &Utc);
//! let report = DailyEventReport::new(window);
//! let formatter = ReportFormatter::new(FormatOptions::default());
//! assert_eq!(formatter.format_text_in(&report, &Utc), "No upcoming events found.");
//! ```

use std::fmt::Display;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::event::{CalendarEventEntry, CalendarEvents, DailyEventReport};
use crate::time::EventStart;

/// Format string for timed events.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Format string for all-day events.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable terminal output.
    #[default]
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Configuration options for output formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Only render calendars with this display name.
    pub calendar_filter: Option<String>,
    /// Heading printed above the listing.
    pub heading: String,
    /// Line printed for a calendar without events.
    pub no_events_text: String,
    /// Line printed when the user has no calendars at all.
    pub no_calendars_text: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            calendar_filter: None,
            heading: "Today's events:".to_string(),
            no_events_text: "No events found.".to_string(),
            no_calendars_text: "No upcoming events found.".to_string(),
        }
    }
}

/// One calendar group in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCalendar<'a> {
    /// Calendar display name.
    pub calendar: &'a str,
    /// The calendar's events.
    pub events: &'a [CalendarEventEntry],
    /// Set when the per-calendar cap cut off further events.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl<'a> From<&'a CalendarEvents> for JsonCalendar<'a> {
    fn from(group: &'a CalendarEvents) -> Self {
        Self {
            calendar: &group.calendar.summary,
            events: &group.events,
            truncated: group.truncated,
        }
    }
}

/// Output formatter for daily reports.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    options: FormatOptions,
}

impl ReportFormatter {
    /// Creates a new formatter with the given options.
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    /// Creates a new formatter with default options.
    pub fn with_defaults() -> Self {
        Self::new(FormatOptions::default())
    }

    /// Returns the calendar groups selected by the calendar filter.
    fn selected<'a>(&'a self, report: &'a DailyEventReport) -> Vec<&'a CalendarEvents> {
        match self.options.calendar_filter.as_deref() {
            Some(name) => report.calendars_named(name).collect(),
            None => report.calendars.iter().collect(),
        }
    }

    /// Renders the report as text, in the machine's local time zone.
    pub fn format_text(&self, report: &DailyEventReport) -> String {
        self.format_text_in(report, &Local)
    }

    /// Renders the report as text, with timed events shown in `tz`.
    pub fn format_text_in<Tz>(&self, report: &DailyEventReport, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        if report.is_empty() && report.skipped.is_empty() {
            return self.options.no_calendars_text.clone();
        }

        let mut lines = vec![self.options.heading.clone()];

        for group in self.selected(report) {
            lines.push(String::new());
            lines.push(format!("Events from calendar: {}", group.calendar.summary));

            if group.events.is_empty() {
                lines.push(self.options.no_events_text.clone());
            }
            for event in &group.events {
                lines.push(format!("{} - {}", format_start(&event.start, tz), event.summary));
            }
            if group.truncated {
                lines.push("(more events not shown)".to_string());
            }
        }

        for skipped in &report.skipped {
            lines.push(String::new());
            lines.push(format!(
                "Skipped calendar: {} ({})",
                skipped.calendar.summary, skipped.reason
            ));
        }

        lines.join("\n")
    }

    /// Returns the JSON view of the selected calendars.
    pub fn json_calendars<'a>(&'a self, report: &'a DailyEventReport) -> Vec<JsonCalendar<'a>> {
        self.selected(report).into_iter().map(JsonCalendar::from).collect()
    }

    /// Renders the selected calendars as pretty-printed JSON.
    pub fn format_json(&self, report: &DailyEventReport) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.json_calendars(report))
    }
}

/// One calendar group in the on-disk snapshot.
#[derive(Debug, Serialize)]
struct SnapshotCalendar<'a> {
    calendar: &'a str,
    events: Vec<SnapshotEvent<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
}

/// The provider's item when there is one, else the normalized entry.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SnapshotEvent<'a> {
    Raw(&'a serde_json::Value),
    Entry(&'a CalendarEventEntry),
}

impl<'a> From<&'a CalendarEvents> for SnapshotCalendar<'a> {
    fn from(group: &'a CalendarEvents) -> Self {
        Self {
            calendar: &group.calendar.summary,
            events: group
                .events
                .iter()
                .map(|event| match &event.raw {
                    Some(raw) => SnapshotEvent::Raw(raw),
                    None => SnapshotEvent::Entry(event),
                })
                .collect(),
            truncated: group.truncated,
        }
    }
}

/// Renders the JSON snapshot of every calendar in the report.
///
/// The snapshot ignores any calendar filter; it always holds the full day.
/// Events keep every field the provider returned (end time, location,
/// links and so on).
pub fn snapshot_json(report: &DailyEventReport) -> serde_json::Result<String> {
    let calendars: Vec<SnapshotCalendar<'_>> =
        report.calendars.iter().map(SnapshotCalendar::from).collect();
    serde_json::to_string(&calendars)
}

/// Formats an event start for display.
///
/// Timed starts are shown as `YYYY-MM-DD HH:MM` in `tz`, all-day starts as
/// `YYYY-MM-DD`.
pub fn format_start<Tz>(start: &EventStart, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match start {
        EventStart::DateTime(dt) => dt.with_timezone(tz).format(DATETIME_FORMAT).to_string(),
        EventStart::Date(date) => date.format(DATE_FORMAT).to_string(),
    }
}
