//! Event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of an event.
///
/// `Cancelled` is terminal: no further registration changes are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Draft => write!(f, "draft"),
            EventStatus::Published => write!(f, "published"),
            EventStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    /// Maximum number of registered attendees; `None` means unlimited.
    pub capacity: Option<i32>,
    /// Count of `registered` attendance records only; waitlisted entrants
    /// are not included. Mutated exclusively inside ledger transactions.
    pub attendee_count: i32,
    pub waitlist_enabled: bool,
    pub status: EventStatus,
    pub external_calendar_id: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event still accepts registration changes.
    pub fn accepts_registrations(&self) -> bool {
        self.status != EventStatus::Cancelled
    }

    /// Whether the event is linked to an external calendar system.
    pub fn has_calendar_link(&self) -> bool {
        self.external_calendar_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub waitlist_enabled: bool,
    pub external_calendar_id: Option<String>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub waitlist_enabled: Option<bool>,
    pub external_calendar_id: Option<String>,
}
