//! Attendance record model and registration state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::{GatherHubError, Result};

/// Type of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RegistrationKind {
    Registered,
    Waitlist,
}

impl std::fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationKind::Registered => write!(f, "registered"),
            RegistrationKind::Waitlist => write!(f, "waitlist"),
        }
    }
}

/// One attendance record per (event, user) pair.
///
/// `waitlist_position` is present iff `kind` is `Waitlist`; positions for an
/// event form a contiguous sequence starting at 1, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub kind: RegistrationKind,
    pub waitlist_position: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Registration state of a (event, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationState {
    Unregistered,
    Registered,
    Waitlisted,
}

/// Transitions the registration workflow may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationAction {
    Register,
    JoinWaitlist,
    Cancel,
    /// Promotion off the waitlist head; never user-initiated.
    Promote,
}

impl RegistrationState {
    /// Derive the state from the persisted record, if any.
    pub fn of(record: Option<&AttendanceRecord>) -> Self {
        match record.map(|r| r.kind) {
            None => RegistrationState::Unregistered,
            Some(RegistrationKind::Registered) => RegistrationState::Registered,
            Some(RegistrationKind::Waitlist) => RegistrationState::Waitlisted,
        }
    }

    /// The single transition function for registration state.
    ///
    /// Illegal transitions are rejected here rather than by scattered
    /// conditionals at the call sites.
    pub fn apply(
        self,
        action: RegistrationAction,
        event_id: i64,
        user_id: i64,
    ) -> Result<RegistrationState> {
        use RegistrationAction::*;
        use RegistrationState::*;

        match (self, action) {
            (Unregistered, Register) => Ok(Registered),
            (Unregistered, JoinWaitlist) => Ok(Waitlisted),
            (Registered, Cancel) | (Waitlisted, Cancel) => Ok(Unregistered),
            (Waitlisted, Promote) => Ok(Registered),
            (Registered, Register)
            | (Registered, JoinWaitlist)
            | (Waitlisted, Register)
            | (Waitlisted, JoinWaitlist) => {
                Err(GatherHubError::AlreadyRegistered { event_id, user_id })
            }
            (Unregistered, Cancel) => Err(GatherHubError::NotRegistered { event_id, user_id }),
            (state, Promote) => Err(GatherHubError::InvalidStateTransition {
                from: format!("{:?}", state),
                to: "Registered".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_register_from_unregistered() {
        let next = RegistrationState::Unregistered
            .apply(RegistrationAction::Register, 1, 2)
            .unwrap();
        assert_eq!(next, RegistrationState::Registered);
    }

    #[test]
    fn test_waitlist_from_unregistered() {
        let next = RegistrationState::Unregistered
            .apply(RegistrationAction::JoinWaitlist, 1, 2)
            .unwrap();
        assert_eq!(next, RegistrationState::Waitlisted);
    }

    #[test]
    fn test_cancel_from_both_active_states() {
        assert_eq!(
            RegistrationState::Registered
                .apply(RegistrationAction::Cancel, 1, 2)
                .unwrap(),
            RegistrationState::Unregistered
        );
        assert_eq!(
            RegistrationState::Waitlisted
                .apply(RegistrationAction::Cancel, 1, 2)
                .unwrap(),
            RegistrationState::Unregistered
        );
    }

    #[test]
    fn test_promotion_only_from_waitlist() {
        assert_eq!(
            RegistrationState::Waitlisted
                .apply(RegistrationAction::Promote, 1, 2)
                .unwrap(),
            RegistrationState::Registered
        );
        assert_matches!(
            RegistrationState::Unregistered.apply(RegistrationAction::Promote, 1, 2),
            Err(GatherHubError::InvalidStateTransition { .. })
        );
        assert_matches!(
            RegistrationState::Registered.apply(RegistrationAction::Promote, 1, 2),
            Err(GatherHubError::InvalidStateTransition { .. })
        );
    }

    #[test]
    fn test_double_registration_rejected() {
        assert_matches!(
            RegistrationState::Registered.apply(RegistrationAction::Register, 1, 2),
            Err(GatherHubError::AlreadyRegistered { event_id: 1, user_id: 2 })
        );
        assert_matches!(
            RegistrationState::Waitlisted.apply(RegistrationAction::JoinWaitlist, 1, 2),
            Err(GatherHubError::AlreadyRegistered { .. })
        );
    }

    #[test]
    fn test_cancel_without_record_rejected() {
        assert_matches!(
            RegistrationState::Unregistered.apply(RegistrationAction::Cancel, 1, 2),
            Err(GatherHubError::NotRegistered { .. })
        );
    }

    #[test]
    fn test_state_of_record() {
        assert_eq!(
            RegistrationState::of(None),
            RegistrationState::Unregistered
        );

        let record = AttendanceRecord {
            id: 1,
            event_id: 1,
            user_id: 2,
            kind: RegistrationKind::Waitlist,
            waitlist_position: Some(1),
            created_at: chrono::Utc::now(),
        };
        assert_eq!(
            RegistrationState::of(Some(&record)),
            RegistrationState::Waitlisted
        );
    }
}
