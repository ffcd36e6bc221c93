//! CalendarApi trait definition.
//!
//! This module defines the [`CalendarApi`] trait, the seam between the day
//! query engine and the HTTP calendar backend. The production implementation
//! is [`crate::google::GoogleCalendarClient`]; tests substitute in-memory
//! fakes.

use std::future::Future;
use std::pin::Pin;

use todaycal_core::{CalendarEventEntry, CalendarIdentity, DayWindow};

use crate::error::ProviderResult;

/// Events returned for one calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarFetch {
    /// Events in the order the provider returned them.
    pub events: Vec<CalendarEventEntry>,
    /// Whether the result cap cut off further pages.
    pub truncated: bool,
}

impl CalendarFetch {
    /// Creates a fetch result with events and no truncation.
    pub fn with_events(events: Vec<CalendarEventEntry>) -> Self {
        Self {
            events,
            truncated: false,
        }
    }

    /// Builder method to mark the result as truncated.
    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }
}

/// A boxed future for async trait methods.
///
/// This is used because async functions in traits are not yet stable in a way
/// that works well with dynamic dispatch. Using boxed futures allows the trait
/// to be object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read access to a user's calendars.
///
/// # Implementation Notes
///
/// - Implementations handle pagination internally
/// - `list_events` must expand recurring events into single instances and
///   return them ordered by start
/// - No retries: the first failure is returned to the caller
pub trait CalendarApi: Send + Sync {
    /// Returns the name of this backend (e.g., "google").
    fn name(&self) -> &str;

    /// Lists every calendar visible to the user, in provider order.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarIdentity>>>;

    /// Lists events of one calendar overlapping `window`.
    ///
    /// At most `max_results` events are returned; if more exist the fetch is
    /// marked truncated.
    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        window: &'a DayWindow,
        max_results: usize,
    ) -> BoxFuture<'a, ProviderResult<CalendarFetch>>;
}
