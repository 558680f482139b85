//! Google Calendar API type definitions
//!
//! These types mirror the Calendar API v3 resources and are used for serialization/deserialization.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Start or end of an event
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// Timed events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    /// All-day events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// IANA time zone name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// A calendar event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Event ID
    pub id: String,

    /// Title
    #[serde(default)]
    pub summary: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    #[serde(default)]
    pub start: EventDateTime,

    #[serde(default)]
    pub end: EventDateTime,

    /// Link to the event in the Calendar UI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Response of `events.list`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Body of `events.insert`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertEventRequest {
    pub summary: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,

    pub start: EventDateTime,

    pub end: EventDateTime,
}

/// Parameters for creating an event
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Parameters for listing events
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub max_results: Option<u32>,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
}

/// Default and ceiling for `maxResults`
pub const DEFAULT_MAX_RESULTS: u32 = 10;
pub const MAX_RESULTS_LIMIT: u32 = 2500;

impl EventQuery {
    /// `maxResults` clamped to what the API accepts
    pub fn effective_max_results(&self) -> u32 {
        self.max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_LIMIT)
    }
}

/// A user-supplied event time
///
/// Times with an offset are sent as-is; naive times are sent without an
/// offset and interpreted by the API in the event's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

impl EventTime {
    /// Parse RFC 3339 or a naive ISO 8601 date-time
    pub fn parse(field: &str, value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        let parsed = DateTime::parse_from_rfc3339(value)
            .map(EventTime::Zoned)
            .ok()
            .or_else(|| {
                NAIVE_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                    .map(EventTime::Naive)
            });

        match parsed {
            Some(time) => time.in_range(field),
            None => Err(ValidationError::InvalidParameter {
                name: field.to_string(),
                message: format!(
                    "'{}' is not an ISO date-time (e.g. '2024-01-15T14:00:00')",
                    value
                ),
            }),
        }
    }

    fn year(&self) -> i32 {
        match self {
            EventTime::Zoned(dt) => dt.year(),
            EventTime::Naive(dt) => dt.year(),
        }
    }

    /// Reject years outside 1..=9999, which RFC 3339 cannot represent
    fn in_range(self, field: &str) -> Result<Self, ValidationError> {
        if YEAR_RANGE.contains(&self.year()) {
            Ok(self)
        } else {
            Err(ValidationError::InvalidParameter {
                name: field.to_string(),
                message: format!("year {} is out of range", self.year()),
            })
        }
    }

    /// One hour from now, in UTC
    pub fn default_start() -> Self {
        let now: DateTime<FixedOffset> = Utc::now().trunc_subsecs(0).into();
        EventTime::Zoned(now + Duration::hours(1))
    }

    /// `self` shifted by `hours`, reported against `field` if it leaves the valid range
    pub fn plus_hours(self, field: &str, hours: i64) -> Result<Self, ValidationError> {
        let shifted = match self {
            EventTime::Zoned(dt) => dt.checked_add_signed(Duration::hours(hours)).map(EventTime::Zoned),
            EventTime::Naive(dt) => dt.checked_add_signed(Duration::hours(hours)).map(EventTime::Naive),
        };
        shifted
            .ok_or_else(|| ValidationError::InvalidParameter {
                name: field.to_string(),
                message: "date-time is out of range".to_string(),
            })?
            .in_range(field)
    }

    /// Whether `self` is strictly before `other`, when comparable
    pub fn is_before(&self, other: &EventTime) -> Option<bool> {
        match (self, other) {
            (EventTime::Zoned(a), EventTime::Zoned(b)) => Some(a < b),
            (EventTime::Naive(a), EventTime::Naive(b)) => Some(a < b),
            _ => None,
        }
    }

    /// Value for the API `dateTime` field
    pub fn to_api_string(&self) -> String {
        match self {
            EventTime::Zoned(dt) => dt.to_rfc3339(),
            EventTime::Naive(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// RFC 3339 value for query bounds; naive times are taken as UTC
    pub fn to_query_string(&self) -> String {
        match self {
            EventTime::Zoned(dt) => dt.to_rfc3339(),
            EventTime::Naive(dt) => dt.and_utc().to_rfc3339(),
        }
    }

    pub fn to_event_date_time(&self, time_zone: &str) -> EventDateTime {
        EventDateTime {
            date_time: Some(self.to_api_string()),
            date: None,
            time_zone: Some(time_zone.to_string()),
        }
    }
}
