//! Batch invitation processor and invitation response handler
//!
//! Takes a raw block of addressees, resolves which correspond to known
//! members, creates one invitation per resolvable addressee under a shared
//! batch, and reports sent/failed counts. Also applies accept/reject to a
//! single invitation, feeding accepted invitations into the registration
//! workflow.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::config::InvitationConfig;
use crate::models::{
    AttendanceRecord, Invitation, InvitationBatch, InvitationResponse, InvitationStatus,
    NewInvitation, NewInvitationBatch, Profile,
};
use crate::services::effects::Effect;
use crate::services::registration::{Placement, RegistrationLedger, RegistrationService};
use crate::utils::errors::{GatherHubError, Result};
use crate::utils::helpers::{clamp_expiration_days, is_valid_email, parse_addressees};

/// Membership lookup: which contact identifiers belong to known members.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Return the subset of `contacts` that correspond to member accounts.
    async fn resolve_contacts(&self, contacts: &[String]) -> Result<Vec<Profile>>;

    /// Contact identifier on file for one member, if known.
    async fn contact_for(&self, user_id: i64) -> Result<Option<String>>;
}

/// Persistence operations for invitations and their batches.
#[async_trait]
pub trait InvitationStore: Send + Sync {
    async fn create_batch(&self, batch: NewInvitationBatch) -> Result<InvitationBatch>;

    /// Insert a pending invitation unless the invitee already holds an
    /// active one for the event; returns `None` in that case.
    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Option<Invitation>>;

    /// Freeze the batch counts and mark it completed.
    async fn finalize_batch(
        &self,
        batch_id: i64,
        sent: i32,
        failed: i32,
    ) -> Result<InvitationBatch>;

    async fn find_invitation(&self, invitation_id: i64) -> Result<Option<Invitation>>;

    /// Persist a response to a still-pending invitation, stamping
    /// `last_viewed_at`.
    async fn record_response(
        &self,
        invitation_id: i64,
        status: InvitationStatus,
        viewed_at: DateTime<Utc>,
    ) -> Result<Invitation>;

    async fn mark_viewed(&self, invitation_id: i64, viewed_at: DateTime<Utc>) -> Result<()>;
}

/// Result of one bulk-invite submission.
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch: InvitationBatch,
    pub invitations: Vec<Invitation>,
}

/// What happened to the attendance side of an accepted invitation.
#[derive(Debug)]
pub enum RegistrationAttempt {
    /// The accept created a new attendance record.
    Completed {
        record: AttendanceRecord,
        placement: Placement,
    },
    /// A record already existed and was left untouched.
    AlreadyRegistered,
    /// The accept stands, but registration was refused (event filled up or
    /// was cancelled between invitation and response).
    Skipped { reason: String },
    /// Rejection; no ledger action taken.
    NotAttempted,
}

/// Committed result of an invitation response plus the effects to attempt.
#[derive(Debug)]
pub struct RespondOutcome {
    pub invitation: Invitation,
    pub registration: RegistrationAttempt,
    pub effects: Vec<Effect>,
}

/// Invitation service
#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn InvitationStore>,
    directory: Arc<dyn MemberDirectory>,
    ledger: Arc<dyn RegistrationLedger>,
    registration: RegistrationService,
    config: InvitationConfig,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn InvitationStore>,
        directory: Arc<dyn MemberDirectory>,
        ledger: Arc<dyn RegistrationLedger>,
        registration: RegistrationService,
        config: InvitationConfig,
    ) -> Self {
        Self {
            store,
            directory,
            ledger,
            registration,
            config,
        }
    }

    /// Submit a bulk invitation batch.
    ///
    /// `raw_addressees` is split on commas and newlines; duplicates are not
    /// de-duplicated before counting, so `total` reflects raw entries. An
    /// addressee that resolves to no member account, or that already holds
    /// an active invitation, counts as failed. A persistence error part-way
    /// through creation stops further inserts but still finalizes the batch
    /// from whatever subset committed.
    pub async fn submit_batch(
        &self,
        event_id: i64,
        creator: Option<i64>,
        raw_addressees: &str,
        message: Option<String>,
        expiration_days: Option<i64>,
    ) -> Result<BatchOutcome> {
        let creator_id = creator.ok_or(GatherHubError::Unauthenticated)?;

        let event = self
            .ledger
            .find_event(event_id)
            .await?
            .ok_or(GatherHubError::EventNotFound { event_id })?;
        if !event.accepts_registrations() {
            return Err(GatherHubError::EventCancelled { event_id });
        }

        let addressees = parse_addressees(raw_addressees);
        if addressees.is_empty() {
            return Err(GatherHubError::EmptyBatch);
        }
        let total = addressees.len() as i32;

        let batch = self
            .store
            .create_batch(NewInvitationBatch {
                event_id,
                created_by: creator_id,
                message,
                total,
            })
            .await?;

        let members = self.resolve_members(&addressees).await?;

        let days = clamp_expiration_days(
            expiration_days.unwrap_or(self.config.default_expiration_days),
        );
        let expires_at = Utc::now() + Duration::days(days);

        let mut invitations = Vec::new();
        for addressee in &addressees {
            let Some(profile) = members.get(&addressee.to_lowercase()) else {
                // Unknown addressee: excluded from creation, counted as
                // failed via the final tally.
                continue;
            };

            match self
                .store
                .create_invitation(NewInvitation {
                    event_id,
                    inviter_id: creator_id,
                    invitee_id: profile.id,
                    batch_id: Some(batch.id),
                    expires_at: Some(expires_at),
                })
                .await
            {
                Ok(Some(invitation)) => invitations.push(invitation),
                Ok(None) => {
                    // Already holds an active invitation for this event.
                    warn!(
                        event_id = event_id,
                        invitee_id = profile.id,
                        "Skipping duplicate invitation"
                    );
                }
                Err(e) => {
                    // Stop creating, but never leave the batch stuck in
                    // processing: finalize from what committed.
                    error!(
                        batch_id = batch.id,
                        error = %e,
                        "Invitation creation failed part-way through batch"
                    );
                    break;
                }
            }
        }

        let sent = invitations.len() as i32;
        let batch = self
            .store
            .finalize_batch(batch.id, sent, total - sent)
            .await?;

        info!(
            batch_id = batch.id,
            event_id = event_id,
            total = batch.total,
            sent = batch.sent,
            failed = batch.failed,
            "Invitation batch completed"
        );

        Ok(BatchOutcome { batch, invitations })
    }

    /// Apply the invitee's answer to a pending invitation.
    ///
    /// An accepted invitation feeds into the registration workflow iff no
    /// attendance record exists yet for the pair; a pre-existing record is
    /// left untouched, so re-submission never creates a second one.
    /// Expired invitations are refused.
    pub async fn respond(
        &self,
        invitation_id: i64,
        response: InvitationResponse,
    ) -> Result<RespondOutcome> {
        let invitation = self
            .store
            .find_invitation(invitation_id)
            .await?
            .ok_or(GatherHubError::InvitationNotFound { invitation_id })?;

        let now = Utc::now();
        let next_status = invitation.status.respond(response, invitation_id)?;
        if invitation.is_expired(now) {
            return Err(GatherHubError::Expired { invitation_id });
        }

        let invitation = self
            .store
            .record_response(invitation_id, next_status, now)
            .await?;

        let mut effects = Vec::new();
        let registration = match response {
            InvitationResponse::Rejected => RegistrationAttempt::NotAttempted,
            InvitationResponse::Accepted => {
                self.register_accepted(&invitation, &mut effects).await?
            }
        };

        info!(
            invitation_id = invitation_id,
            event_id = invitation.event_id,
            status = %invitation.status,
            "Invitation response recorded"
        );

        Ok(RespondOutcome {
            invitation,
            registration,
            effects,
        })
    }

    /// Stamp the invitation as seen by the invitee.
    pub async fn mark_viewed(&self, invitation_id: i64) -> Result<()> {
        self.store.mark_viewed(invitation_id, Utc::now()).await
    }

    async fn register_accepted(
        &self,
        invitation: &Invitation,
        effects: &mut Vec<Effect>,
    ) -> Result<RegistrationAttempt> {
        let existing = self
            .ledger
            .find_record(invitation.event_id, invitation.invitee_id)
            .await?;
        if existing.is_some() {
            return Ok(RegistrationAttempt::AlreadyRegistered);
        }

        match self
            .registration
            .register(invitation.event_id, Some(invitation.invitee_id))
            .await
        {
            Ok(outcome) => {
                effects.extend(outcome.effects);
                Ok(RegistrationAttempt::Completed {
                    record: outcome.record,
                    placement: outcome.placement,
                })
            }
            // A concurrent registration between the existence check and the
            // insert; the accept is still idempotent.
            Err(GatherHubError::AlreadyRegistered { .. }) => {
                Ok(RegistrationAttempt::AlreadyRegistered)
            }
            // The accept stands even when the event can no longer take the
            // invitee; accept and registration are separate entities.
            Err(
                e @ (GatherHubError::EventFull { .. } | GatherHubError::EventCancelled { .. }),
            ) => {
                warn!(
                    invitation_id = invitation.id,
                    event_id = invitation.event_id,
                    reason = %e,
                    "Accepted invitation could not be registered"
                );
                Ok(RegistrationAttempt::Skipped {
                    reason: e.user_message(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_members(&self, addressees: &[String]) -> Result<HashMap<String, Profile>> {
        // Only plausible contact identifiers go to the lookup; the rest
        // simply never resolve.
        let lookup: Vec<String> = addressees
            .iter()
            .filter(|a| is_valid_email(a))
            .map(|a| a.to_lowercase())
            .collect();

        let profiles = self.directory.resolve_contacts(&lookup).await?;
        Ok(profiles
            .into_iter()
            .map(|p| (p.email.to_lowercase(), p))
            .collect())
    }
}
