//! Invitation and invitation batch models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::{GatherHubError, Result};

/// Status of a single invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationStatus::Pending => write!(f, "pending"),
            InvitationStatus::Accepted => write!(f, "accepted"),
            InvitationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// The invitee's answer to a pending invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationResponse {
    Accepted,
    Rejected,
}

impl InvitationStatus {
    /// The single transition function for invitation status.
    ///
    /// Only `Pending` invitations may be answered; both answers are
    /// terminal.
    pub fn respond(self, response: InvitationResponse, invitation_id: i64) -> Result<Self> {
        match self {
            InvitationStatus::Pending => Ok(match response {
                InvitationResponse::Accepted => InvitationStatus::Accepted,
                InvitationResponse::Rejected => InvitationStatus::Rejected,
            }),
            _ => Err(GatherHubError::NotPending { invitation_id }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: i64,
    pub event_id: i64,
    pub inviter_id: i64,
    pub invitee_id: i64,
    pub batch_id: Option<i64>,
    pub status: InvitationStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// Whether the invitation's expiration timestamp has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvitation {
    pub event_id: i64,
    pub inviter_id: i64,
    pub invitee_id: i64,
    pub batch_id: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Status of a bulk invitation submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "batch_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
}

/// Shared accounting for one bulk invitation submission.
///
/// `sent + failed <= total` at all times; counts are frozen once the batch
/// is `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvitationBatch {
    pub id: i64,
    pub batch_ref: Uuid,
    pub event_id: i64,
    pub created_by: i64,
    pub message: Option<String>,
    pub total: i32,
    pub sent: i32,
    pub failed: i32,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvitationBatch {
    pub event_id: i64,
    pub created_by: i64,
    pub message: Option<String>,
    pub total: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_pending_accepts_both_answers() {
        assert_eq!(
            InvitationStatus::Pending
                .respond(InvitationResponse::Accepted, 1)
                .unwrap(),
            InvitationStatus::Accepted
        );
        assert_eq!(
            InvitationStatus::Pending
                .respond(InvitationResponse::Rejected, 1)
                .unwrap(),
            InvitationStatus::Rejected
        );
    }

    #[test]
    fn test_answered_invitations_are_terminal() {
        assert_matches!(
            InvitationStatus::Accepted.respond(InvitationResponse::Accepted, 5),
            Err(GatherHubError::NotPending { invitation_id: 5 })
        );
        assert_matches!(
            InvitationStatus::Rejected.respond(InvitationResponse::Accepted, 5),
            Err(GatherHubError::NotPending { .. })
        );
    }

    #[test]
    fn test_expiration_check() {
        let now = Utc::now();
        let invitation = Invitation {
            id: 1,
            event_id: 1,
            inviter_id: 1,
            invitee_id: 2,
            batch_id: None,
            status: InvitationStatus::Pending,
            expires_at: Some(now - chrono::Duration::hours(1)),
            last_viewed_at: None,
            created_at: now - chrono::Duration::days(8),
        };
        assert!(invitation.is_expired(now));

        let open_ended = Invitation {
            expires_at: None,
            ..invitation.clone()
        };
        assert!(!open_ended.is_expired(now));

        let future = Invitation {
            expires_at: Some(now + chrono::Duration::days(1)),
            ..invitation
        };
        assert!(!future.is_expired(now));
    }
}
