//! Notification sink
//!
//! Fire-and-forget delivery of registration and cancellation notices to an
//! external notification service. Delivery failures are reported to the
//! caller so the dispatcher can log them, but they never roll back the
//! state change that triggered them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::NotificationConfig;
use crate::utils::errors::{GatherHubError, Result};

/// Kind of notification delivered to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RegistrationUpdate,
    Cancellation,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::RegistrationUpdate => write!(f, "registration_update"),
            NotificationKind::Cancellation => write!(f, "cancellation"),
        }
    }
}

/// Payload delivered to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event_id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub status: String,
}

impl Notification {
    pub fn registration_update(event_id: i64, user_id: i64, status: impl Into<String>) -> Self {
        Self {
            event_id,
            user_id,
            kind: NotificationKind::RegistrationUpdate,
            status: status.into(),
        }
    }

    pub fn cancellation(event_id: i64, user_id: i64) -> Self {
        Self {
            event_id,
            user_id,
            kind: NotificationKind::Cancellation,
            status: "cancelled".to_string(),
        }
    }
}

/// External notification sink consumed by the effect dispatcher.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Webhook-backed notification sink.
#[derive(Clone)]
pub struct WebhookNotificationSink {
    http_client: reqwest::Client,
    config: NotificationConfig,
}

impl WebhookNotificationSink {
    /// Create a new WebhookNotificationSink instance
    pub fn new(config: NotificationConfig) -> Result<Self> {
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
impl NotificationSink for WebhookNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let webhook_url = self.config.webhook_url.as_deref().ok_or_else(|| {
            GatherHubError::ServiceUnavailable("notification webhook not configured".to_string())
        })?;

        debug!(
            event_id = notification.event_id,
            user_id = notification.user_id,
            kind = %notification.kind,
            "Delivering notification"
        );

        self.http_client
            .post(webhook_url)
            .json(notification)
            .send()
            .await?
            .error_for_status()?;

        info!(
            event_id = notification.event_id,
            user_id = notification.user_id,
            kind = %notification.kind,
            "Notification delivered"
        );
        Ok(())
    }
}

/// Log-only notification sink for development and for deployments without
/// a webhook endpoint.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(
            event_id = notification.event_id,
            user_id = notification.user_id,
            kind = %notification.kind,
            status = %notification.status,
            "Notification (log sink)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_payload_serialization() {
        let notification = Notification::registration_update(7, 42, "waitlist");
        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("\"type\":\"registration_update\""));
        assert!(json.contains("\"status\":\"waitlist\""));
        assert!(json.contains("\"event_id\":7"));
    }

    #[test]
    fn test_cancellation_payload() {
        let notification = Notification::cancellation(7, 42);
        assert_eq!(notification.kind, NotificationKind::Cancellation);
        assert_eq!(notification.status, "cancelled");
    }

    #[tokio::test]
    async fn test_log_sink_always_succeeds() {
        let sink = LogNotificationSink::new();
        let notification = Notification::cancellation(1, 2);
        assert!(sink.deliver(&notification).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_sink_without_url_is_unavailable() {
        let sink = WebhookNotificationSink::new(NotificationConfig {
            webhook_url: None,
            timeout_seconds: 5,
        })
        .unwrap();

        let result = sink.deliver(&Notification::cancellation(1, 2)).await;
        assert!(matches!(
            result,
            Err(GatherHubError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_webhook_sink_posts_payload() {
        use wiremock::matchers::{body_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let notification = Notification::registration_update(7, 42, "registered");

        Mock::given(method("POST"))
            .and(path("/notify"))
            .and(body_json(&notification))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sink = WebhookNotificationSink::new(NotificationConfig {
            webhook_url: Some(format!("{}/notify", server.uri())),
            timeout_seconds: 5,
        })
        .unwrap();

        sink.deliver(&notification).await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_sink_surfaces_http_failure() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = WebhookNotificationSink::new(NotificationConfig {
            webhook_url: Some(server.uri()),
            timeout_seconds: 5,
        })
        .unwrap();

        let result = sink.deliver(&Notification::cancellation(1, 2)).await;
        assert!(matches!(result, Err(GatherHubError::Http(_))));
    }
}
