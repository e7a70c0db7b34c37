//! Calendar sync sink
//!
//! Best-effort synchronization of attendance changes to an external
//! calendar system, for events linked to one. Also provides "Add to
//! Calendar" URL and iCal generation for read views.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CalendarConfig;
use crate::models::Event;
use crate::utils::errors::{GatherHubError, Result};
use crate::utils::helpers::format_calendar_timestamp;

/// Attendance status carried to the calendar system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarSyncStatus {
    Registered,
    Cancelled,
}

impl std::fmt::Display for CalendarSyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarSyncStatus::Registered => write!(f, "registered"),
            CalendarSyncStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Wire payload for one attendance sync call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSyncPayload {
    pub external_calendar_id: String,
    pub user_contact: String,
    pub status: CalendarSyncStatus,
}

/// External calendar sink consumed by the effect dispatcher.
#[async_trait]
pub trait CalendarSink: Send + Sync {
    async fn sync_attendance(&self, payload: &CalendarSyncPayload) -> Result<()>;
}

/// HTTP-backed calendar sync service.
#[derive(Clone)]
pub struct CalendarSyncService {
    http_client: reqwest::Client,
    config: CalendarConfig,
}

impl CalendarSyncService {
    /// Create a new CalendarSyncService instance
    pub fn new(config: CalendarConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .user_agent("GatherHub/1.0")
            .build()
            .map_err(GatherHubError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

#[async_trait]
impl CalendarSink for CalendarSyncService {
    async fn sync_attendance(&self, payload: &CalendarSyncPayload) -> Result<()> {
        debug!(
            calendar_id = %payload.external_calendar_id,
            status = %payload.status,
            "Syncing attendance to external calendar"
        );

        self.http_client
            .post(&self.config.api_url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;

        info!(
            calendar_id = %payload.external_calendar_id,
            status = %payload.status,
            "Calendar attendance synced"
        );
        Ok(())
    }
}

/// Generate an "Add to Calendar" URL for an event.
pub fn add_to_calendar_url(event: &Event) -> String {
    let start_time = format_calendar_timestamp(event.starts_at);
    // Assume 2-hour duration if not specified
    let end_time = format_calendar_timestamp(event.starts_at + chrono::Duration::hours(2));

    let mut url = "https://calendar.google.com/calendar/render?action=TEMPLATE".to_string();
    url.push_str(&format!("&text={}", urlencoding::encode(&event.title)));
    url.push_str(&format!("&dates={}/{}", start_time, end_time));

    if let Some(description) = &event.description {
        url.push_str(&format!("&details={}", urlencoding::encode(description)));
    }

    if let Some(location) = &event.location {
        url.push_str(&format!("&location={}", urlencoding::encode(location)));
    }

    url
}

/// Generate iCal format for an event
pub fn to_ical(event: &Event) -> String {
    let start_time = format_calendar_timestamp(event.starts_at);
    let end_time = format_calendar_timestamp(event.starts_at + chrono::Duration::hours(2));
    let created_time = format_calendar_timestamp(event.created_at);

    let mut ical = String::new();
    ical.push_str("BEGIN:VCALENDAR\r\n");
    ical.push_str("VERSION:2.0\r\n");
    ical.push_str("PRODID:-//GatherHub//GatherHub Core//EN\r\n");
    ical.push_str("BEGIN:VEVENT\r\n");
    ical.push_str(&format!("UID:gatherhub-{}\r\n", event.id));
    ical.push_str(&format!("DTSTART:{}\r\n", start_time));
    ical.push_str(&format!("DTEND:{}\r\n", end_time));
    ical.push_str(&format!("DTSTAMP:{}\r\n", created_time));
    ical.push_str(&format!("SUMMARY:{}\r\n", event.title));

    if let Some(description) = &event.description {
        ical.push_str(&format!("DESCRIPTION:{}\r\n", description.replace('\n', "\\n")));
    }

    if let Some(location) = &event.location {
        ical.push_str(&format!("LOCATION:{}\r\n", location));
    }

    ical.push_str("STATUS:CONFIRMED\r\n");
    ical.push_str("END:VEVENT\r\n");
    ical.push_str("END:VCALENDAR\r\n");

    ical
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_event() -> Event {
        Event {
            id: 1,
            title: "Spring Picnic".to_string(),
            description: Some("Bring a dish".to_string()),
            starts_at: Utc::now(),
            location: Some("Riverside Park".to_string()),
            capacity: None,
            attendee_count: 0,
            waitlist_enabled: false,
            status: crate::models::EventStatus::Published,
            external_calendar_id: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_to_calendar_url() {
        let url = add_to_calendar_url(&sample_event());
        assert!(url.contains("calendar.google.com"));
        assert!(url.contains("Spring%20Picnic"));
        assert!(url.contains("Bring%20a%20dish"));
        assert!(url.contains("Riverside%20Park"));
    }

    #[test]
    fn test_to_ical() {
        let ical = to_ical(&sample_event());
        assert!(ical.contains("BEGIN:VCALENDAR"));
        assert!(ical.contains("BEGIN:VEVENT"));
        assert!(ical.contains("SUMMARY:Spring Picnic"));
        assert!(ical.contains("DESCRIPTION:Bring a dish"));
        assert!(ical.contains("LOCATION:Riverside Park"));
        assert!(ical.contains("END:VEVENT"));
        assert!(ical.contains("END:VCALENDAR"));
    }

    #[tokio::test]
    async fn test_sync_posts_payload() {
        use wiremock::matchers::{body_json, method};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let payload = CalendarSyncPayload {
            external_calendar_id: "cal_abc123".to_string(),
            user_contact: "a@x.com".to_string(),
            status: CalendarSyncStatus::Registered,
        };

        Mock::given(method("POST"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let service = CalendarSyncService::new(CalendarConfig {
            api_url: server.uri(),
            timeout_seconds: 5,
        })
        .unwrap();

        service.sync_attendance(&payload).await.unwrap();
    }

    #[test]
    fn test_sync_payload_serialization() {
        let payload = CalendarSyncPayload {
            external_calendar_id: "cal_abc123".to_string(),
            user_contact: "a@x.com".to_string(),
            status: CalendarSyncStatus::Cancelled,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"status\":\"cancelled\""));
        assert!(json.contains("cal_abc123"));
    }
}
