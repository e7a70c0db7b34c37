//! Error handling for GatherHub
//!
//! This module defines the main error types used throughout the crate
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for the GatherHub core
#[derive(Error, Debug)]
pub enum GatherHubError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Operation requires a signed-in member")]
    Unauthenticated,

    #[error("Event has been cancelled: {event_id}")]
    EventCancelled { event_id: i64 },

    #[error("Event is full: {event_id}")]
    EventFull { event_id: i64 },

    #[error("Already registered for event {event_id}: user {user_id}")]
    AlreadyRegistered { event_id: i64, user_id: i64 },

    #[error("Not registered for event {event_id}: user {user_id}")]
    NotRegistered { event_id: i64, user_id: i64 },

    #[error("Invitation batch contained no addressees")]
    EmptyBatch,

    #[error("Invitation is not pending: {invitation_id}")]
    NotPending { invitation_id: i64 },

    #[error("Invitation has expired: {invitation_id}")]
    Expired { invitation_id: i64 },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Invitation not found: {invitation_id}")]
    InvitationNotFound { invitation_id: i64 },

    #[error("Invitation batch not found: {batch_id}")]
    BatchNotFound { batch_id: i64 },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for GatherHub operations
pub type Result<T> = std::result::Result<T, GatherHubError>;

impl GatherHubError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            GatherHubError::Database(_) => false,
            GatherHubError::Migration(_) => false,
            GatherHubError::Redis(_) => true,
            GatherHubError::Http(_) => true,
            GatherHubError::Serialization(_) => false,
            GatherHubError::Config(_) => false,
            GatherHubError::UrlParse(_) => false,
            GatherHubError::ServiceUnavailable(_) => true,
            _ => false,
        }
    }

    /// Human-readable message suitable for showing to the acting member.
    ///
    /// Every caller-facing precondition failure gets a distinct message
    /// rather than a generic one.
    pub fn user_message(&self) -> String {
        match self {
            GatherHubError::Unauthenticated => {
                "You need to be signed in to do that.".to_string()
            }
            GatherHubError::EventCancelled { .. } => {
                "This event has been cancelled.".to_string()
            }
            GatherHubError::EventFull { .. } => "This event is full.".to_string(),
            GatherHubError::AlreadyRegistered { .. } => {
                "You're already registered for this event.".to_string()
            }
            GatherHubError::NotRegistered { .. } => {
                "You're not registered for this event.".to_string()
            }
            GatherHubError::EmptyBatch => {
                "No addressees found. Add at least one email address.".to_string()
            }
            GatherHubError::NotPending { .. } => {
                "This invitation has already been answered.".to_string()
            }
            GatherHubError::Expired { .. } => "This invitation has expired.".to_string(),
            GatherHubError::EventNotFound { .. } => "Event not found.".to_string(),
            GatherHubError::UserNotFound { .. } => "Member not found.".to_string(),
            GatherHubError::InvitationNotFound { .. } => "Invitation not found.".to_string(),
            GatherHubError::InvalidInput(msg) => msg.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GatherHubError::Database(_) => ErrorSeverity::Critical,
            GatherHubError::Migration(_) => ErrorSeverity::Critical,
            GatherHubError::Config(_) => ErrorSeverity::Critical,
            GatherHubError::Redis(_) => ErrorSeverity::Warning,
            GatherHubError::Http(_) => ErrorSeverity::Warning,
            GatherHubError::ServiceUnavailable(_) => ErrorSeverity::Warning,
            GatherHubError::Unauthenticated
            | GatherHubError::EventCancelled { .. }
            | GatherHubError::EventFull { .. }
            | GatherHubError::AlreadyRegistered { .. }
            | GatherHubError::NotRegistered { .. }
            | GatherHubError::EmptyBatch
            | GatherHubError::NotPending { .. }
            | GatherHubError::Expired { .. }
            | GatherHubError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_messages_are_distinct() {
        let errors = [
            GatherHubError::Unauthenticated,
            GatherHubError::EventCancelled { event_id: 1 },
            GatherHubError::EventFull { event_id: 1 },
            GatherHubError::AlreadyRegistered { event_id: 1, user_id: 2 },
            GatherHubError::NotRegistered { event_id: 1, user_id: 2 },
            GatherHubError::EmptyBatch,
            GatherHubError::NotPending { invitation_id: 1 },
            GatherHubError::Expired { invitation_id: 1 },
        ];

        let messages: Vec<String> = errors.iter().map(|e| e.user_message()).collect();
        let mut unique = messages.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), messages.len());
    }

    #[test]
    fn test_precondition_errors_are_info_severity() {
        assert_eq!(
            GatherHubError::EventFull { event_id: 7 }.severity(),
            ErrorSeverity::Info
        );
        assert_eq!(GatherHubError::EmptyBatch.severity(), ErrorSeverity::Info);
    }

    #[test]
    fn test_infrastructure_errors_are_not_user_facing() {
        let err = GatherHubError::ServiceUnavailable("webhook sink".to_string());
        assert!(err.is_recoverable());
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
    }
}
