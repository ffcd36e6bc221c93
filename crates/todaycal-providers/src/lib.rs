//! Google Calendar access for the daily report.
//!
//! This crate provides:
//!
//! - [`google`] - OAuth2 credential management and the Calendar API client
//! - [`CalendarApi`] - The seam between the query engine and the HTTP backend
//! - [`EventQueryEngine`] - Collects one local day of events across calendars
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐  load/persist  ┌────────────────┐
//! │ CredentialManager    │◀──────────────▶│ token.json     │
//! └──────────┬───────────┘                └────────────────┘
//!            │ AuthorizedSession
//!            ▼
//! ┌──────────────────────┐  CalendarApi   ┌────────────────┐
//! │ GoogleCalendarClient │───────────────▶│ EventQuery-    │
//! └──────────────────────┘                │ Engine         │
//!                                         └───────┬────────┘
//!                                                 ▼
//!                                          DailyEventReport
//! ```

pub mod error;
pub mod google;
pub mod provider;
pub mod query;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ErrorCategory, ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{BoxFuture, CalendarApi, CalendarFetch};
pub use query::{EventQueryEngine, FailurePolicy, MAX_EVENTS_PER_CALENDAR, compute_day_window};
