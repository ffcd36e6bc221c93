//! Event query engine.
//!
//! Enumerates every calendar visible to the user and collects, per calendar,
//! the events that start inside one local day. The provider returns events
//! that merely overlap the requested window, so entries starting outside it
//! are discarded here.

use tracing::{debug, info, warn};

use todaycal_core::{
    CalendarEvents, CalendarIdentity, DailyEventReport, DayWindow, EventStart, SkippedCalendar,
};

use crate::error::ProviderResult;
use crate::provider::{CalendarApi, CalendarFetch};

pub use todaycal_core::compute_day_window;

/// Upper bound on events fetched per calendar.
pub const MAX_EVENTS_PER_CALENDAR: usize = 100;

/// What to do when fetching one calendar's events fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole report on the first failing calendar.
    #[default]
    Abort,
    /// Log the failure, record the calendar as skipped and continue.
    SkipFailed,
}

/// Builds a [`DailyEventReport`] from a [`CalendarApi`].
#[derive(Debug)]
pub struct EventQueryEngine<A> {
    api: A,
    policy: FailurePolicy,
    max_results: usize,
}

impl<A: CalendarApi> EventQueryEngine<A> {
    /// Creates a new engine with the default failure policy.
    pub fn new(api: A) -> Self {
        Self {
            api,
            policy: FailurePolicy::default(),
            max_results: MAX_EVENTS_PER_CALENDAR,
        }
    }

    /// Sets the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Lowers the per-calendar cap. Values above
    /// [`MAX_EVENTS_PER_CALENDAR`] are clamped.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, MAX_EVENTS_PER_CALENDAR);
        self
    }

    /// Returns the failure policy in use.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Returns the underlying API.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Lists every calendar visible to the user, in provider order.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarIdentity>> {
        let calendars = self.api.list_calendars().await?;
        debug!(count = calendars.len(), backend = self.api.name(), "listed calendars");
        Ok(calendars)
    }

    /// Lists the events of one calendar that start inside `window`, sorted by
    /// start.
    pub async fn list_events_for_calendar(
        &self,
        calendar_id: &str,
        window: &DayWindow,
    ) -> ProviderResult<CalendarFetch> {
        let fetch = self
            .api
            .list_events(calendar_id, window, self.max_results)
            .await?;

        let returned = fetch.events.len();
        let mut events: Vec<_> = fetch
            .events
            .into_iter()
            .filter(|event| window.contains_start(&event.start))
            .collect();

        if events.len() != returned {
            debug!(
                calendar_id,
                discarded = returned - events.len(),
                "discarded events starting outside the day window"
            );
        }

        // All-day entries sort at the start of the window.
        events.sort_by_key(|event| match &event.start {
            EventStart::Date(_) => window.start,
            EventStart::DateTime(dt) => dt.to_utc(),
        });

        if fetch.truncated {
            warn!(
                calendar_id,
                limit = self.max_results,
                "calendar has more events than the per-calendar limit, results truncated"
            );
        }

        Ok(CalendarFetch {
            events,
            truncated: fetch.truncated,
        })
    }

    /// Builds the report for the current local day.
    pub async fn list_all_events(&self) -> ProviderResult<DailyEventReport> {
        self.list_all_events_in(DayWindow::today()).await
    }

    /// Builds the report for the given window.
    ///
    /// Calendars are fetched one at a time, in enumeration order. Calendars
    /// with no events still appear in the report.
    pub async fn list_all_events_in(&self, window: DayWindow) -> ProviderResult<DailyEventReport> {
        info!(
            date = %window.date,
            start = %window.start,
            end = %window.end,
            "querying events for day"
        );

        let calendars = self.list_calendars().await?;
        let mut report = DailyEventReport::new(window);

        for calendar in calendars {
            match self
                .list_events_for_calendar(&calendar.id, &report.window)
                .await
            {
                Ok(fetch) => {
                    debug!(
                        calendar = %calendar.summary,
                        events = fetch.events.len(),
                        "fetched calendar events"
                    );
                    report.calendars.push(
                        CalendarEvents::new(calendar, fetch.events).with_truncated(fetch.truncated),
                    );
                }
                Err(e) => match self.policy {
                    FailurePolicy::Abort => return Err(e.with_calendar(calendar.summary)),
                    FailurePolicy::SkipFailed => {
                        warn!(calendar = %calendar.summary, error = %e, "skipping calendar");
                        report.skipped.push(SkippedCalendar {
                            reason: e.to_string(),
                            calendar,
                        });
                    }
                },
            }
        }

        Ok(report)
    }
}
