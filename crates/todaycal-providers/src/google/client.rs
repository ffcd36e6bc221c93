//! Google Calendar API client.
//!
//! This module provides the HTTP client for the two Calendar v3 endpoints the
//! day report needs: the user's calendar list and a calendar's events. It
//! handles authentication, request building, pagination and response
//! parsing.

use chrono::{DateTime, NaiveDate, SecondsFormat};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use todaycal_core::{CalendarEventEntry, CalendarIdentity, DayWindow, EventStart};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarApi, CalendarFetch};

use super::auth::AuthorizedSession;
use super::config::GoogleConfig;
use super::oauth::build_http_client;

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    session: AuthorizedSession,
    api_base: String,
}

impl GoogleCalendarClient {
    /// Creates a client issuing requests on behalf of `session`.
    pub fn new(config: &GoogleConfig, session: AuthorizedSession) -> ProviderResult<Self> {
        Ok(Self {
            http_client: build_http_client(config)?,
            session,
            api_base: config.api_base.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the session used for requests.
    pub fn session(&self) -> &AuthorizedSession {
        &self.session
    }

    /// Lists every calendar in the user's calendar list, following pages.
    pub async fn list_calendar_entries(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", self.api_base);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = Vec::new();
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: CalendarListResponse = self.get_json(&url, &query).await?;
            entries.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} calendar list entries", entries.len());
        Ok(entries)
    }

    /// Lists single-instance events of a calendar overlapping `window`,
    /// ordered by start.
    ///
    /// Stops after `max_results` events; if the provider has more pages at
    /// that point the result is marked truncated.
    pub async fn list_window_events(
        &self,
        calendar_id: &str,
        window: &DayWindow,
        max_results: usize,
    ) -> ProviderResult<CalendarFetch> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        );
        let time_min = window.start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = window.end.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut truncated = false;

        loop {
            let remaining = max_results.saturating_sub(events.len()).max(1);
            let mut query = vec![
                ("timeMin", time_min.clone()),
                ("timeMax", time_max.clone()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", remaining.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: EventListResponse = self
                .get_json(&url, &query)
                .await
                .map_err(|e| e.with_calendar(calendar_id))?;

            for item in page.items {
                if let Some(entry) =
                    ApiEvent::parse_item(item).map_err(|e| e.with_calendar(calendar_id))?
                {
                    events.push(entry);
                }
            }

            if events.len() >= max_results {
                truncated = page.next_page_token.is_some() || events.len() > max_results;
                events.truncate(max_results);
                break;
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "fetched {} events from calendar {}{}",
            events.len(),
            calendar_id,
            if truncated { " (truncated)" } else { "" }
        );
        Ok(CalendarFetch { events, truncated })
    }

    /// Issues an authorized GET and decodes the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let access_token = self.session.access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, retry_after));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google"
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarIdentity>>> {
        Box::pin(async move {
            let entries = self.list_calendar_entries().await?;
            Ok(entries
                .into_iter()
                .map(CalendarListEntry::into_identity)
                .collect())
        })
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        window: &'a DayWindow,
        max_results: usize,
    ) -> BoxFuture<'a, ProviderResult<CalendarFetch>> {
        Box::pin(self.list_window_events(calendar_id, window, max_results))
    }
}

/// Maps a non-success status to a provider error.
fn status_error(status: reqwest::StatusCode, body: &str, retry_after: Option<u64>) -> ProviderError {
    let detail = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            ProviderError::unauthorized(format!("access token expired or invalid: {}", detail))
        }
        reqwest::StatusCode::FORBIDDEN => {
            ProviderError::forbidden(format!("access denied to calendar: {}", detail))
        }
        reqwest::StatusCode::NOT_FOUND => ProviderError::not_found(detail),
        reqwest::StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        s if s.is_client_error() => {
            ProviderError::bad_request(format!("API error ({}): {}", status, detail))
        }
        _ => ProviderError::server(format!("API error ({}): {}", status, detail)),
    }
}

/// Response from the calendarList.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// An entry in the user's calendar list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// Calendar ID.
    pub id: String,
    /// Calendar title.
    #[serde(default)]
    pub summary: Option<String>,
}

impl CalendarListEntry {
    fn into_identity(self) -> CalendarIdentity {
        let summary = self.summary.unwrap_or_else(|| self.id.clone());
        CalendarIdentity::new(self.id, summary)
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    status: Option<String>,
    summary: Option<String>,
    start: Option<ApiEventTime>,
}

/// Event time from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

impl ApiEvent {
    /// Decodes one events.list item, keeping the item itself alongside the
    /// entry.
    fn parse_item(item: serde_json::Value) -> ProviderResult<Option<CalendarEventEntry>> {
        let event: ApiEvent = serde_json::from_value(item.clone())
            .map_err(|e| ProviderError::invalid_response(format!("invalid event item: {}", e)))?;
        Ok(event.into_entry().map(|entry| entry.with_raw(item)))
    }

    /// Converts the event, dropping cancelled ones and ones without a usable
    /// start.
    fn into_entry(self) -> Option<CalendarEventEntry> {
        let id = self.id.as_deref().unwrap_or("<no id>");

        if self.status.as_deref() == Some("cancelled") {
            debug!("skipping cancelled event {}", id);
            return None;
        }

        let start = match self.start {
            Some(ApiEventTime {
                date_time: Some(dt),
                ..
            }) => {
                let parsed = DateTime::parse_from_rfc3339(&dt)
                    .map_err(|e| warn!("event {}: failed to parse start time: {}", id, e))
                    .ok()?;
                EventStart::DateTime(parsed)
            }
            Some(ApiEventTime {
                date: Some(date), ..
            }) => {
                let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|e| warn!("event {}: failed to parse start date: {}", id, e))
                    .ok()?;
                EventStart::Date(parsed)
            }
            _ => {
                warn!("event {} has no start time", id);
                return None;
            }
        };

        Some(CalendarEventEntry::new(
            self.summary.unwrap_or_default(),
            start,
        ))
    }
}

/// Error body of the Calendar API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
