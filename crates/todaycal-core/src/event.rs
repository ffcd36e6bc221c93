//! Report types for a day of calendar events.
//!
//! A [`DailyEventReport`] groups the events starting inside one
//! [`DayWindow`] by the calendar they came from, preserving the order in
//! which the provider enumerated the calendars.

use serde::{Deserialize, Serialize};

use crate::time::{DayWindow, EventStart};

/// A calendar visible to the authorized user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarIdentity {
    /// Provider-assigned calendar identifier.
    pub id: String,
    /// Human-readable calendar name.
    pub summary: String,
}

impl CalendarIdentity {
    /// Creates a new calendar identity.
    pub fn new(id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
        }
    }
}

/// A single event (or a single occurrence of a recurring event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventEntry {
    /// The event title.
    #[serde(default)]
    pub summary: String,
    /// When the event starts.
    pub start: EventStart,
    /// The provider's full event item, kept for the on-disk snapshot.
    #[serde(skip)]
    pub raw: Option<serde_json::Value>,
}

impl CalendarEventEntry {
    /// Creates a new event entry.
    pub fn new(summary: impl Into<String>, start: EventStart) -> Self {
        Self {
            summary: summary.into(),
            start,
            raw: None,
        }
    }

    /// Attaches the provider's event item.
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// The events of one calendar for the report's day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvents {
    /// The calendar the events belong to.
    pub calendar: CalendarIdentity,
    /// Events sorted by start, ascending.
    pub events: Vec<CalendarEventEntry>,
    /// Whether the per-calendar result cap cut off further events.
    #[serde(default)]
    pub truncated: bool,
}

impl CalendarEvents {
    /// Creates a new, non-truncated group.
    pub fn new(calendar: CalendarIdentity, events: Vec<CalendarEventEntry>) -> Self {
        Self {
            calendar,
            events,
            truncated: false,
        }
    }

    /// Builder method to mark the group as truncated.
    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }
}

/// A calendar left out of a report because fetching its events failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCalendar {
    /// The calendar that was skipped.
    pub calendar: CalendarIdentity,
    /// Why the fetch failed.
    pub reason: String,
}

/// Everything happening in one local day, per calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyEventReport {
    /// The day the report covers.
    pub window: DayWindow,
    /// Per-calendar events, in calendar enumeration order.
    pub calendars: Vec<CalendarEvents>,
    /// Calendars whose fetch failed and that were skipped.
    #[serde(default)]
    pub skipped: Vec<SkippedCalendar>,
}

impl DailyEventReport {
    /// Creates an empty report for the given window.
    pub fn new(window: DayWindow) -> Self {
        Self {
            window,
            calendars: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Returns true if no calendar was enumerated at all.
    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }

    /// Returns the total number of events across all calendars.
    pub fn event_count(&self) -> usize {
        self.calendars.iter().map(|c| c.events.len()).sum()
    }

    /// Returns true if any calendar's results were truncated.
    pub fn is_truncated(&self) -> bool {
        self.calendars.iter().any(|c| c.truncated)
    }

    /// Returns the calendars whose display name equals `name`.
    pub fn calendars_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a CalendarEvents> + 'a {
        self.calendars.iter().filter(move |c| c.calendar.summary == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn window() -> DayWindow {
        DayWindow::for_date(NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(), &Utc)
    }

    fn entry(title: &str, hour: u32) -> CalendarEventEntry {
        CalendarEventEntry::new(
            title,
            EventStart::from_datetime(Utc.with_ymd_and_hms(2025, 2, 5, hour, 0, 0).unwrap()),
        )
    }

    fn sample_report() -> DailyEventReport {
        let mut report = DailyEventReport::new(window());
        report.calendars.push(CalendarEvents::new(
            CalendarIdentity::new("work@example.com", "Work"),
            vec![entry("Standup", 9), entry("Review", 15)],
        ));
        report.calendars.push(
            CalendarEvents::new(CalendarIdentity::new("family", "Personal"), vec![])
                .with_truncated(true),
        );
        report
    }

    #[test]
    fn counts_and_flags() {
        let report = sample_report();
        assert!(!report.is_empty());
        assert_eq!(report.event_count(), 2);
        assert!(report.is_truncated());
        assert!(DailyEventReport::new(window()).is_empty());
    }

    #[test]
    fn calendars_named_filters_by_summary() {
        let report = sample_report();
        let names: Vec<_> = report
            .calendars_named("Personal")
            .map(|c| c.calendar.id.as_str())
            .collect();
        assert_eq!(names, vec!["family"]);
        assert_eq!(report.calendars_named("Nope").count(), 0);
    }

    #[test]
    fn entry_without_summary_deserializes_to_empty_title() {
        let parsed: CalendarEventEntry =
            serde_json::from_str(r#"{"start": {"date": "2025-02-05"}}"#).unwrap();
        assert_eq!(parsed.summary, "");
        assert!(parsed.start.is_all_day());
    }

    #[test]
    fn report_serde_roundtrip() {
        let report = sample_report();
        let json = serde_json::to_string(&report).unwrap();
        let parsed: DailyEventReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, parsed);
    }
}
