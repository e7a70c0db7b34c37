//! In-memory test doubles
//!
//! Deterministic implementations of the persistence and sink seams, with
//! the same observable semantics as the Postgres-backed repositories.
//! Used by this crate's unit tests and by the integration tests under
//! `tests/`; kept in the library so both can share them.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AttendanceRecord, BatchStatus, Event, EventStatus, Invitation, InvitationBatch,
    InvitationStatus, NewInvitation, NewInvitationBatch, Profile, RegistrationKind,
};
use crate::services::calendar::{CalendarSink, CalendarSyncPayload};
use crate::services::invitation::{InvitationStore, MemberDirectory};
use crate::services::notification::{Notification, NotificationSink};
use crate::services::registration::RegistrationLedger;
use crate::utils::errors::{GatherHubError, Result};

/// Fixture builders for models.
pub mod fixtures {
    use super::*;

    pub fn published_event(id: i64, capacity: Option<i32>, waitlist_enabled: bool) -> Event {
        Event {
            id,
            title: format!("Event {}", id),
            description: None,
            starts_at: Utc::now() + chrono::Duration::days(7),
            location: None,
            capacity,
            attendee_count: 0,
            waitlist_enabled,
            status: EventStatus::Published,
            external_calendar_id: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn profile(id: i64, email: &str) -> Profile {
        Profile {
            id,
            email: email.to_string(),
            display_name: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Default)]
struct LedgerState {
    events: HashMap<i64, Event>,
    records: HashMap<(i64, i64), AttendanceRecord>,
    /// Stale attendee counts reported by `find_event`, for simulating a
    /// concurrent registration committing between read and insert.
    reported_counts: HashMap<i64, i32>,
    next_record_id: i64,
}

/// In-memory registration ledger.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_event(&self, event: Event) {
        let mut state = self.state.lock().unwrap();
        state.events.insert(event.id, event);
    }

    /// Make `find_event` report a stale attendee count while the guarded
    /// ledger mutations keep using the true one.
    pub fn set_reported_attendee_count(&self, event_id: i64, count: i32) {
        let mut state = self.state.lock().unwrap();
        state.reported_counts.insert(event_id, count);
    }

    /// Insert a registered record directly, bypassing the workflow.
    pub fn register_directly(&self, event_id: i64, user_id: i64) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_record_id + 1;
        state.next_record_id = id;
        state.records.insert(
            (event_id, user_id),
            AttendanceRecord {
                id,
                event_id,
                user_id,
                kind: RegistrationKind::Registered,
                waitlist_position: None,
                created_at: Utc::now(),
            },
        );
        if let Some(event) = state.events.get_mut(&event_id) {
            event.attendee_count += 1;
        }
    }

    /// True registered attendee count for an event.
    pub fn registered_count(&self, event_id: i64) -> i32 {
        let state = self.state.lock().unwrap();
        state
            .events
            .get(&event_id)
            .map(|e| e.attendee_count)
            .unwrap_or(0)
    }

    /// All waitlist positions for an event, ascending.
    pub fn waitlist_positions(&self, event_id: i64) -> Vec<i32> {
        let state = self.state.lock().unwrap();
        let mut positions: Vec<i32> = state
            .records
            .values()
            .filter(|r| r.event_id == event_id && r.kind == RegistrationKind::Waitlist)
            .filter_map(|r| r.waitlist_position)
            .collect();
        positions.sort_unstable();
        positions
    }

    /// Total attendance records (registered and waitlisted) for an event.
    pub fn record_count(&self, event_id: i64) -> usize {
        let state = self.state.lock().unwrap();
        state
            .records
            .values()
            .filter(|r| r.event_id == event_id)
            .count()
    }
}

#[async_trait]
impl RegistrationLedger for InMemoryLedger {
    async fn find_event(&self, event_id: i64) -> Result<Option<Event>> {
        let state = self.state.lock().unwrap();
        Ok(state.events.get(&event_id).map(|event| {
            let mut event = event.clone();
            if let Some(stale) = state.reported_counts.get(&event_id) {
                event.attendee_count = *stale;
            }
            event
        }))
    }

    async fn find_record(
        &self,
        event_id: i64,
        user_id: i64,
    ) -> Result<Option<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.records.get(&(event_id, user_id)).cloned())
    }

    async fn add_registered(&self, event_id: i64, user_id: i64) -> Result<AttendanceRecord> {
        let mut state = self.state.lock().unwrap();

        let event = state
            .events
            .get(&event_id)
            .ok_or(GatherHubError::EventNotFound { event_id })?;
        if event.status == EventStatus::Cancelled {
            return Err(GatherHubError::EventCancelled { event_id });
        }
        if state.records.contains_key(&(event_id, user_id)) {
            return Err(GatherHubError::AlreadyRegistered { event_id, user_id });
        }
        if let Some(capacity) = event.capacity {
            if event.attendee_count >= capacity {
                return Err(GatherHubError::EventFull { event_id });
            }
        }

        let id = state.next_record_id + 1;
        state.next_record_id = id;
        let record = AttendanceRecord {
            id,
            event_id,
            user_id,
            kind: RegistrationKind::Registered,
            waitlist_position: None,
            created_at: Utc::now(),
        };
        state.records.insert((event_id, user_id), record.clone());
        state
            .events
            .get_mut(&event_id)
            .expect("event checked above")
            .attendee_count += 1;

        Ok(record)
    }

    async fn add_waitlisted(&self, event_id: i64, user_id: i64) -> Result<AttendanceRecord> {
        let mut state = self.state.lock().unwrap();

        let event = state
            .events
            .get(&event_id)
            .ok_or(GatherHubError::EventNotFound { event_id })?;
        if event.status == EventStatus::Cancelled {
            return Err(GatherHubError::EventCancelled { event_id });
        }
        if state.records.contains_key(&(event_id, user_id)) {
            return Err(GatherHubError::AlreadyRegistered { event_id, user_id });
        }

        let next_position = state
            .records
            .values()
            .filter(|r| r.event_id == event_id && r.kind == RegistrationKind::Waitlist)
            .filter_map(|r| r.waitlist_position)
            .max()
            .unwrap_or(0)
            + 1;

        let id = state.next_record_id + 1;
        state.next_record_id = id;
        let record = AttendanceRecord {
            id,
            event_id,
            user_id,
            kind: RegistrationKind::Waitlist,
            waitlist_position: Some(next_position),
            created_at: Utc::now(),
        };
        state.records.insert((event_id, user_id), record.clone());

        Ok(record)
    }

    async fn remove_record(&self, event_id: i64, user_id: i64) -> Result<AttendanceRecord> {
        let mut state = self.state.lock().unwrap();

        let removed = state
            .records
            .remove(&(event_id, user_id))
            .ok_or(GatherHubError::NotRegistered { event_id, user_id })?;

        match removed.kind {
            RegistrationKind::Registered => {
                if let Some(event) = state.events.get_mut(&event_id) {
                    event.attendee_count -= 1;
                }
            }
            RegistrationKind::Waitlist => {
                let gap = removed.waitlist_position.unwrap_or(0);
                for record in state.records.values_mut() {
                    if record.event_id == event_id
                        && record.kind == RegistrationKind::Waitlist
                        && record.waitlist_position.is_some_and(|p| p > gap)
                    {
                        record.waitlist_position = record.waitlist_position.map(|p| p - 1);
                    }
                }
            }
        }

        Ok(removed)
    }

    async fn promote_head(&self, event_id: i64) -> Result<Option<AttendanceRecord>> {
        let mut state = self.state.lock().unwrap();

        let Some(event) = state.events.get(&event_id) else {
            return Err(GatherHubError::EventNotFound { event_id });
        };
        if event.status == EventStatus::Cancelled {
            return Ok(None);
        }
        if let Some(capacity) = event.capacity {
            if event.attendee_count >= capacity {
                return Ok(None);
            }
        }

        let head_key = state
            .records
            .iter()
            .find(|(_, r)| {
                r.event_id == event_id
                    && r.kind == RegistrationKind::Waitlist
                    && r.waitlist_position == Some(1)
            })
            .map(|(key, _)| *key);

        let Some(head_key) = head_key else {
            return Ok(None);
        };

        let promoted = {
            let record = state.records.get_mut(&head_key).expect("key found above");
            record.kind = RegistrationKind::Registered;
            record.waitlist_position = None;
            record.clone()
        };

        for record in state.records.values_mut() {
            if record.event_id == event_id
                && record.kind == RegistrationKind::Waitlist
                && record.waitlist_position.is_some_and(|p| p > 1)
            {
                record.waitlist_position = record.waitlist_position.map(|p| p - 1);
            }
        }

        state
            .events
            .get_mut(&event_id)
            .expect("event checked above")
            .attendee_count += 1;

        Ok(Some(promoted))
    }
}

#[derive(Default)]
struct InvitationState {
    batches: HashMap<i64, InvitationBatch>,
    invitations: HashMap<i64, Invitation>,
    next_batch_id: i64,
    next_invitation_id: i64,
    insert_attempts: usize,
}

/// In-memory invitation store.
#[derive(Default)]
pub struct InMemoryInvitationStore {
    state: Mutex<InvitationState>,
    /// Fail invitation inserts after this many have succeeded.
    fail_after: Option<usize>,
}

impl InMemoryInvitationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose invitation inserts start failing after `n` successes,
    /// for exercising partial-failure accounting.
    pub fn failing_after(n: usize) -> Self {
        Self {
            state: Mutex::new(InvitationState::default()),
            fail_after: Some(n),
        }
    }

    pub fn batch_count(&self) -> usize {
        self.state.lock().unwrap().batches.len()
    }

    pub fn set_expiration(&self, invitation_id: i64, expires_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(invitation) = state.invitations.get_mut(&invitation_id) {
            invitation.expires_at = Some(expires_at);
        }
    }
}

#[async_trait]
impl InvitationStore for InMemoryInvitationStore {
    async fn create_batch(&self, batch: NewInvitationBatch) -> Result<InvitationBatch> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_batch_id + 1;
        state.next_batch_id = id;

        let created = InvitationBatch {
            id,
            batch_ref: Uuid::new_v4(),
            event_id: batch.event_id,
            created_by: batch.created_by,
            message: batch.message,
            total: batch.total,
            sent: 0,
            failed: 0,
            status: BatchStatus::Processing,
            created_at: Utc::now(),
            completed_at: None,
        };
        state.batches.insert(id, created.clone());
        Ok(created)
    }

    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Option<Invitation>> {
        let mut state = self.state.lock().unwrap();

        if let Some(limit) = self.fail_after {
            if state.insert_attempts >= limit {
                return Err(GatherHubError::ServiceUnavailable(
                    "simulated storage failure".to_string(),
                ));
            }
        }

        let duplicate = state.invitations.values().any(|i| {
            i.event_id == invitation.event_id
                && i.invitee_id == invitation.invitee_id
                && i.status == InvitationStatus::Pending
        });
        if duplicate {
            return Ok(None);
        }

        state.insert_attempts += 1;
        let id = state.next_invitation_id + 1;
        state.next_invitation_id = id;

        let created = Invitation {
            id,
            event_id: invitation.event_id,
            inviter_id: invitation.inviter_id,
            invitee_id: invitation.invitee_id,
            batch_id: invitation.batch_id,
            status: InvitationStatus::Pending,
            expires_at: invitation.expires_at,
            last_viewed_at: None,
            created_at: Utc::now(),
        };
        state.invitations.insert(id, created.clone());
        Ok(Some(created))
    }

    async fn finalize_batch(
        &self,
        batch_id: i64,
        sent: i32,
        failed: i32,
    ) -> Result<InvitationBatch> {
        let mut state = self.state.lock().unwrap();
        let batch = state
            .batches
            .get_mut(&batch_id)
            .filter(|b| b.status == BatchStatus::Processing)
            .ok_or(GatherHubError::BatchNotFound { batch_id })?;

        batch.sent = sent;
        batch.failed = failed;
        batch.status = BatchStatus::Completed;
        batch.completed_at = Some(Utc::now());
        Ok(batch.clone())
    }

    async fn find_invitation(&self, invitation_id: i64) -> Result<Option<Invitation>> {
        let state = self.state.lock().unwrap();
        Ok(state.invitations.get(&invitation_id).cloned())
    }

    async fn record_response(
        &self,
        invitation_id: i64,
        status: InvitationStatus,
        viewed_at: DateTime<Utc>,
    ) -> Result<Invitation> {
        let mut state = self.state.lock().unwrap();
        let invitation = state
            .invitations
            .get_mut(&invitation_id)
            .filter(|i| i.status == InvitationStatus::Pending)
            .ok_or(GatherHubError::NotPending { invitation_id })?;

        invitation.status = status;
        invitation.last_viewed_at = Some(viewed_at);
        Ok(invitation.clone())
    }

    async fn mark_viewed(&self, invitation_id: i64, viewed_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(invitation) = state.invitations.get_mut(&invitation_id) {
            invitation.last_viewed_at = Some(viewed_at);
        }
        Ok(())
    }
}

/// In-memory member directory.
#[derive(Default)]
pub struct InMemoryDirectory {
    profiles: Mutex<HashMap<i64, Profile>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, id: i64, email: &str) {
        let mut profiles = self.profiles.lock().unwrap();
        profiles.insert(id, fixtures::profile(id, email));
    }
}

#[async_trait]
impl MemberDirectory for InMemoryDirectory {
    async fn resolve_contacts(&self, contacts: &[String]) -> Result<Vec<Profile>> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles
            .values()
            .filter(|p| contacts.iter().any(|c| c.eq_ignore_ascii_case(&p.email)))
            .cloned()
            .collect())
    }

    async fn contact_for(&self, user_id: i64) -> Result<Option<String>> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles.get(&user_id).map(|p| p.email.clone()))
    }
}

/// Notification sink that records every delivered payload.
#[derive(Default)]
pub struct RecordingNotificationSink {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Notification sink that always fails, for failure-isolation tests.
pub struct FailingNotificationSink;

#[async_trait]
impl NotificationSink for FailingNotificationSink {
    async fn deliver(&self, _notification: &Notification) -> Result<()> {
        Err(GatherHubError::ServiceUnavailable(
            "simulated sink outage".to_string(),
        ))
    }
}

/// Calendar sink that records every synced payload.
#[derive(Default)]
pub struct RecordingCalendarSink {
    synced: Mutex<Vec<CalendarSyncPayload>>,
}

impl RecordingCalendarSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn synced(&self) -> Vec<CalendarSyncPayload> {
        self.synced.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarSink for RecordingCalendarSink {
    async fn sync_attendance(&self, payload: &CalendarSyncPayload) -> Result<()> {
        self.synced.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ledger_duplicate_pair_rejected() {
        tokio_test::block_on(async {
            let ledger = InMemoryLedger::new();
            ledger.insert_event(fixtures::published_event(1, Some(5), true));

            ledger.add_registered(1, 10).await.unwrap();
            let err = ledger.add_registered(1, 10).await.unwrap_err();
            assert!(matches!(err, GatherHubError::AlreadyRegistered { .. }));

            let err = ledger.add_waitlisted(1, 10).await.unwrap_err();
            assert!(matches!(err, GatherHubError::AlreadyRegistered { .. }));
        });
    }

    #[test]
    fn test_ledger_promote_on_empty_waitlist_is_noop() {
        tokio_test::block_on(async {
            let ledger = InMemoryLedger::new();
            ledger.insert_event(fixtures::published_event(1, Some(5), true));

            assert!(ledger.promote_head(1).await.unwrap().is_none());
            assert_eq!(ledger.registered_count(1), 0);
        });
    }

    #[test]
    fn test_ledger_promote_skipped_when_slot_retaken() {
        tokio_test::block_on(async {
            let ledger = InMemoryLedger::new();
            ledger.insert_event(fixtures::published_event(1, Some(1), true));

            ledger.add_registered(1, 10).await.unwrap();
            ledger.add_waitlisted(1, 11).await.unwrap();

            // Event is full again; the waitlist head stays put.
            assert!(ledger.promote_head(1).await.unwrap().is_none());
            assert_eq!(ledger.waitlist_positions(1), vec![1]);
        });
    }

    /// Operations applied against a ledger in property tests.
    #[derive(Debug, Clone)]
    enum LedgerOp {
        Register(i64),
        Cancel(i64),
    }

    fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
        prop_oneof![
            (1i64..8).prop_map(LedgerOp::Register),
            (1i64..8).prop_map(LedgerOp::Cancel),
        ]
    }

    proptest! {
        /// Under any operation sequence, the registered count never
        /// exceeds capacity and waitlist positions stay contiguous from 1.
        #[test]
        fn prop_ledger_invariants_hold(
            ops in proptest::collection::vec(ledger_op_strategy(), 1..40),
            capacity in 1i32..4,
        ) {
            tokio_test::block_on(async {
                let ledger = InMemoryLedger::new();
                ledger.insert_event(fixtures::published_event(1, Some(capacity), true));

                for op in ops {
                    let result = match op {
                        LedgerOp::Register(user) => {
                            match ledger.add_registered(1, user).await {
                                Err(GatherHubError::EventFull { .. }) => {
                                    ledger.add_waitlisted(1, user).await.map(|_| ())
                                }
                                other => other.map(|_| ()),
                            }
                        }
                        LedgerOp::Cancel(user) => {
                            match ledger.remove_record(1, user).await {
                                Ok(removed) => {
                                    if removed.kind == RegistrationKind::Registered {
                                        ledger.promote_head(1).await.map(|_| ())
                                    } else {
                                        Ok(())
                                    }
                                }
                                Err(e) => Err(e),
                            }
                        }
                    };

                    // Precondition failures are expected; invariants must
                    // hold either way.
                    drop(result);

                    let registered = ledger.registered_count(1);
                    prop_assert!(registered <= capacity);

                    let positions = ledger.waitlist_positions(1);
                    let expected: Vec<i32> = (1..=positions.len() as i32).collect();
                    prop_assert_eq!(positions, expected);
                }
                Ok(())
            })?;
        }
    }
}
