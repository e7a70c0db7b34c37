//! Registration workflow
//!
//! Orchestrates register/cancel operations against the registration ledger,
//! applies the capacity policy, triggers promotion of the next waitlisted
//! entrant when a registered slot frees up, and emits side-effect
//! descriptions for the dispatcher. The workflow itself never performs
//! notification or cache I/O: it returns the committed result plus the
//! effects to attempt.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::models::{
    AttendanceRecord, Event, RegistrationAction, RegistrationKind, RegistrationState,
};
use crate::services::calendar::CalendarSyncStatus;
use crate::services::capacity::{self, CapacityDecision};
use crate::services::effects::Effect;
use crate::services::notification::Notification;
use crate::utils::errors::{GatherHubError, Result};
use crate::utils::logging::log_event_action;

/// The authoritative record of attendee-event relationships.
///
/// Implementations must make each operation a single atomic unit against
/// the persistence layer: count mutations commit together with record
/// mutations, waitlist positions derive from current persisted state, and
/// a capacity race inside `add_registered` surfaces as `EventFull` rather
/// than over-admission.
#[async_trait]
pub trait RegistrationLedger: Send + Sync {
    async fn find_event(&self, event_id: i64) -> Result<Option<Event>>;

    async fn find_record(&self, event_id: i64, user_id: i64)
        -> Result<Option<AttendanceRecord>>;

    /// Insert a `registered` record and increment the event's attendee
    /// count. Fails with `AlreadyRegistered` for a duplicate pair and
    /// `EventFull` when the guarded increment finds no free slot.
    async fn add_registered(&self, event_id: i64, user_id: i64) -> Result<AttendanceRecord>;

    /// Insert a `waitlist` record at position `1 + max(existing)`.
    async fn add_waitlisted(&self, event_id: i64, user_id: i64) -> Result<AttendanceRecord>;

    /// Delete the pair's record, decrementing the attendee count for a
    /// `registered` record or re-packing later positions for a `waitlist`
    /// record. Fails with `NotRegistered` when absent.
    async fn remove_record(&self, event_id: i64, user_id: i64) -> Result<AttendanceRecord>;

    /// Convert the waitlist head to `registered` and re-pack the rest.
    /// Returns `None` when there is nothing to promote or the freed slot
    /// was already retaken by a concurrent registration.
    async fn promote_head(&self, event_id: i64) -> Result<Option<AttendanceRecord>>;
}

/// Where a successful registration landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Registered,
    Waitlisted { position: i32 },
}

/// Committed result of a `register` call plus the effects to attempt.
#[derive(Debug)]
pub struct RegistrationOutcome {
    pub record: AttendanceRecord,
    pub placement: Placement,
    pub effects: Vec<Effect>,
}

/// Committed result of a `cancel` call plus the effects to attempt.
#[derive(Debug)]
pub struct CancellationOutcome {
    pub removed: AttendanceRecord,
    pub promoted: Option<AttendanceRecord>,
    pub effects: Vec<Effect>,
}

/// Registration workflow service
#[derive(Clone)]
pub struct RegistrationService {
    ledger: Arc<dyn RegistrationLedger>,
}

impl RegistrationService {
    pub fn new(ledger: Arc<dyn RegistrationLedger>) -> Self {
        Self { ledger }
    }

    /// Register the acting member for an event.
    ///
    /// Precondition order follows the workflow contract: authentication,
    /// event lifecycle, existing record, then capacity. The ledger
    /// re-checks capacity transactionally; a race detected there falls
    /// back to the waitlist when enabled.
    pub async fn register(&self, event_id: i64, actor: Option<i64>) -> Result<RegistrationOutcome> {
        let user_id = actor.ok_or(GatherHubError::Unauthenticated)?;

        let event = self.require_open_event(event_id).await?;

        let existing = self.ledger.find_record(event_id, user_id).await?;
        let state = RegistrationState::of(existing.as_ref());
        // Existence gate through the central transition function; the
        // JoinWaitlist precondition is identical.
        state.apply(RegistrationAction::Register, event_id, user_id)?;

        let decision = capacity::decide(event.attendee_count, event.capacity, event.waitlist_enabled);

        let record = match decision {
            CapacityDecision::Rejected => return Err(GatherHubError::EventFull { event_id }),
            CapacityDecision::Accepted => match self.ledger.add_registered(event_id, user_id).await
            {
                Ok(record) => record,
                // Lost the last slot to a concurrent registration between
                // the count read and the insert.
                Err(GatherHubError::EventFull { .. }) if event.waitlist_enabled => {
                    self.ledger.add_waitlisted(event_id, user_id).await?
                }
                Err(e) => return Err(e),
            },
            CapacityDecision::Waitlisted => self.ledger.add_waitlisted(event_id, user_id).await?,
        };

        let placement = match record.kind {
            RegistrationKind::Registered => Placement::Registered,
            RegistrationKind::Waitlist => Placement::Waitlisted {
                position: record.waitlist_position.unwrap_or(1),
            },
        };

        let mut effects = vec![Effect::Notify(Notification::registration_update(
            event_id,
            user_id,
            record.kind.to_string(),
        ))];
        if placement == Placement::Registered {
            if let Some(calendar_id) = &event.external_calendar_id {
                effects.push(Effect::CalendarSync {
                    external_calendar_id: calendar_id.clone(),
                    user_id,
                    status: CalendarSyncStatus::Registered,
                });
            }
        }
        effects.push(Effect::InvalidateEventCache { event_id });

        log_event_action(event_id, "register", user_id, Some(&record.kind.to_string()));

        Ok(RegistrationOutcome {
            record,
            placement,
            effects,
        })
    }

    /// Cancel the acting member's own registration.
    pub async fn cancel(&self, event_id: i64, actor: Option<i64>) -> Result<CancellationOutcome> {
        let user_id = actor.ok_or(GatherHubError::Unauthenticated)?;
        self.cancel_attendance(event_id, user_id).await
    }

    /// Remove another member's registration on the organizer's behalf.
    /// Shares the cancellation path, including promotion of the waitlist
    /// head when a registered slot frees up.
    pub async fn remove_attendee(
        &self,
        event_id: i64,
        organizer: Option<i64>,
        user_id: i64,
    ) -> Result<CancellationOutcome> {
        organizer.ok_or(GatherHubError::Unauthenticated)?;
        self.cancel_attendance(event_id, user_id).await
    }

    async fn cancel_attendance(&self, event_id: i64, user_id: i64) -> Result<CancellationOutcome> {
        let event = self.require_open_event(event_id).await?;

        let existing = self.ledger.find_record(event_id, user_id).await?;
        let state = RegistrationState::of(existing.as_ref());
        state.apply(RegistrationAction::Cancel, event_id, user_id)?;

        let removed = self.ledger.remove_record(event_id, user_id).await?;

        let mut effects = Vec::new();
        let mut promoted = None;

        if removed.kind == RegistrationKind::Registered {
            promoted = self.ledger.promote_head(event_id).await?;
            if let Some(head) = &promoted {
                effects.push(Effect::Notify(Notification::registration_update(
                    event_id,
                    head.user_id,
                    RegistrationKind::Registered.to_string(),
                )));
                if let Some(calendar_id) = &event.external_calendar_id {
                    effects.push(Effect::CalendarSync {
                        external_calendar_id: calendar_id.clone(),
                        user_id: head.user_id,
                        status: CalendarSyncStatus::Registered,
                    });
                }
                info!(
                    event_id = event_id,
                    promoted_user = head.user_id,
                    "Waitlist head promoted after cancellation"
                );
            }
        }

        effects.push(Effect::Notify(Notification::cancellation(event_id, user_id)));
        if removed.kind == RegistrationKind::Registered {
            if let Some(calendar_id) = &event.external_calendar_id {
                effects.push(Effect::CalendarSync {
                    external_calendar_id: calendar_id.clone(),
                    user_id,
                    status: CalendarSyncStatus::Cancelled,
                });
            }
        }
        effects.push(Effect::InvalidateEventCache { event_id });

        log_event_action(event_id, "cancel", user_id, Some(&removed.kind.to_string()));

        Ok(CancellationOutcome {
            removed,
            promoted,
            effects,
        })
    }

    async fn require_open_event(&self, event_id: i64) -> Result<Event> {
        let event = self
            .ledger
            .find_event(event_id)
            .await?
            .ok_or(GatherHubError::EventNotFound { event_id })?;

        if !event.accepts_registrations() {
            return Err(GatherHubError::EventCancelled { event_id });
        }

        Ok(event)
    }
}
