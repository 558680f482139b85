//! Google Calendar API client
//!
//! High-level client for the create/list event operations.

use std::sync::Arc;

use crate::calendar::auth::Authenticator;
use crate::calendar::types::*;
use crate::config::CalendarConfig;
use crate::error::{AuthError, CalendarApiError, NotesMcpError, Result, ValidationError};

/// Google Calendar API client
pub struct CalendarClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth authenticator
    authenticator: Arc<Authenticator>,

    /// API base URL, without trailing slash
    base_url: String,

    /// Calendar to operate on
    calendar_id: String,

    /// Time zone attached to created events
    time_zone: String,
}

impl CalendarClient {
    /// Create a new Calendar client
    pub fn new(authenticator: Arc<Authenticator>, config: &CalendarConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            authenticator,
            base_url: config.api_base_url.clone(),
            calendar_id: config.calendar_id.clone(),
            time_zone: config.time_zone.clone(),
        }
    }

    /// Get a valid access token
    async fn access_token(&self) -> Result<String> {
        self.authenticator.get_access_token().await
    }

    /// URL of the events collection
    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    /// Create an event, defaulting to a one-hour slot starting in an hour
    pub async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent> {
        let request = self.build_insert_request(event)?;
        let token = self.access_token().await?;

        let response = self
            .http_client
            .post(self.events_url())
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await?;

        let response = check_response(response, "create event").await?;
        let created: CalendarEvent = response.json().await?;
        tracing::info!("Created calendar event {}", created.id);
        Ok(created)
    }

    /// Validate user input and build the `events.insert` body
    pub fn build_insert_request(&self, event: NewEvent) -> Result<InsertEventRequest> {
        if event.summary.trim().is_empty() {
            return Err(NotesMcpError::Validation(ValidationError::MissingField {
                field: "summary".to_string(),
            }));
        }

        let start = match non_blank(&event.start_time) {
            Some(raw) => EventTime::parse("start_time", raw)?,
            None => EventTime::default_start(),
        };
        let end = match non_blank(&event.end_time) {
            Some(raw) => EventTime::parse("end_time", raw)?,
            None => start.plus_hours("end_time", 1)?,
        };

        if start.is_before(&end) == Some(false) {
            return Err(NotesMcpError::Validation(ValidationError::InvalidParameter {
                name: "end_time".to_string(),
                message: "must be after start_time".to_string(),
            }));
        }

        Ok(InsertEventRequest {
            summary: event.summary,
            description: event.description,
            location: event.location,
            start: start.to_event_date_time(&self.time_zone),
            end: end.to_event_date_time(&self.time_zone),
        })
    }

    /// List events in start-time order, as returned by the API
    pub async fn list_events(&self, query: EventQuery) -> Result<Vec<CalendarEvent>> {
        let time_min = match non_blank(&query.time_min) {
            Some(raw) => EventTime::parse("time_min", raw)?.to_query_string(),
            None => chrono::Utc::now().to_rfc3339(),
        };
        let time_max = match non_blank(&query.time_max) {
            Some(raw) => Some(EventTime::parse("time_max", raw)?.to_query_string()),
            None => None,
        };

        let mut params = vec![
            ("timeMin", time_min),
            ("maxResults", query.effective_max_results().to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(time_max) = time_max {
            params.push(("timeMax", time_max));
        }

        let token = self.access_token().await?;
        let response = self
            .http_client
            .get(self.events_url())
            .bearer_auth(&token)
            .query(&params)
            .send()
            .await?;

        let response = check_response(response, "list events").await?;
        let list: EventList = response.json().await?;
        tracing::debug!("Listed {} calendar events", list.items.len());
        Ok(list.items)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Map non-success statuses onto auth and API errors
async fn check_response(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == 429 {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        return Err(NotesMcpError::Calendar(CalendarApiError::RateLimited {
            retry_after_secs,
        }));
    }

    let text = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(NotesMcpError::Auth(AuthError::InvalidCredentials {
            status: status.as_u16(),
            message: text,
        })),
        _ => Err(NotesMcpError::Calendar(CalendarApiError::RequestFailed {
            message: format!("Failed to {} ({}): {}", action, status, text),
        })),
    }
}
