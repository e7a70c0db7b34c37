//! Invitation repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Invitation, InvitationBatch, InvitationStatus, NewInvitation, NewInvitationBatch,
};
use crate::services::invitation::InvitationStore;
use crate::utils::errors::{GatherHubError, Result};

#[derive(Debug, Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a batch by ID
    pub async fn find_batch(&self, batch_id: i64) -> Result<Option<InvitationBatch>> {
        let batch = sqlx::query_as::<_, InvitationBatch>(
            "SELECT id, batch_ref, event_id, created_by, message, total, sent, failed, status, created_at, completed_at FROM event_invitation_batches WHERE id = $1"
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Get invitations created under a batch
    pub async fn get_batch_invitations(&self, batch_id: i64) -> Result<Vec<Invitation>> {
        let invitations = sqlx::query_as::<_, Invitation>(
            "SELECT id, event_id, inviter_id, invitee_id, batch_id, status, expires_at, last_viewed_at, created_at FROM event_invitations WHERE batch_id = $1 ORDER BY created_at ASC"
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invitations)
    }

    /// Get pending invitations for an invitee
    pub async fn get_pending_for_invitee(&self, invitee_id: i64) -> Result<Vec<Invitation>> {
        let invitations = sqlx::query_as::<_, Invitation>(
            "SELECT id, event_id, inviter_id, invitee_id, batch_id, status, expires_at, last_viewed_at, created_at FROM event_invitations WHERE invitee_id = $1 AND status = $2 ORDER BY created_at DESC"
        )
        .bind(invitee_id)
        .bind(InvitationStatus::Pending)
        .fetch_all(&self.pool)
        .await?;

        Ok(invitations)
    }
}

#[async_trait]
impl InvitationStore for InvitationRepository {
    async fn create_batch(&self, batch: NewInvitationBatch) -> Result<InvitationBatch> {
        let created = sqlx::query_as::<_, InvitationBatch>(
            r#"
            INSERT INTO event_invitation_batches (batch_ref, event_id, created_by, message, total, sent, failed, status, created_at)
            VALUES ($1, $2, $3, $4, $5, 0, 0, $6, $7)
            RETURNING id, batch_ref, event_id, created_by, message, total, sent, failed, status, created_at, completed_at
            "#
        )
        .bind(Uuid::new_v4())
        .bind(batch.event_id)
        .bind(batch.created_by)
        .bind(batch.message)
        .bind(batch.total)
        .bind(crate::models::BatchStatus::Processing)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Option<Invitation>> {
        // The partial unique index on pending (event, invitee) pairs makes
        // this a no-op when an active invitation already exists.
        let created = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO event_invitations (event_id, inviter_id, invitee_id, batch_id, status, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (event_id, invitee_id) WHERE status = 'pending' DO NOTHING
            RETURNING id, event_id, inviter_id, invitee_id, batch_id, status, expires_at, last_viewed_at, created_at
            "#
        )
        .bind(invitation.event_id)
        .bind(invitation.inviter_id)
        .bind(invitation.invitee_id)
        .bind(invitation.batch_id)
        .bind(InvitationStatus::Pending)
        .bind(invitation.expires_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(created)
    }

    async fn finalize_batch(
        &self,
        batch_id: i64,
        sent: i32,
        failed: i32,
    ) -> Result<InvitationBatch> {
        let batch = sqlx::query_as::<_, InvitationBatch>(
            r#"
            UPDATE event_invitation_batches
            SET sent = $2, failed = $3, status = $4, completed_at = $5
            WHERE id = $1 AND status = 'processing'
            RETURNING id, batch_ref, event_id, created_by, message, total, sent, failed, status, created_at, completed_at
            "#
        )
        .bind(batch_id)
        .bind(sent)
        .bind(failed)
        .bind(crate::models::BatchStatus::Completed)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatherHubError::BatchNotFound { batch_id })?;

        Ok(batch)
    }

    async fn find_invitation(&self, invitation_id: i64) -> Result<Option<Invitation>> {
        let invitation = sqlx::query_as::<_, Invitation>(
            "SELECT id, event_id, inviter_id, invitee_id, batch_id, status, expires_at, last_viewed_at, created_at FROM event_invitations WHERE id = $1"
        )
        .bind(invitation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    async fn record_response(
        &self,
        invitation_id: i64,
        status: InvitationStatus,
        viewed_at: DateTime<Utc>,
    ) -> Result<Invitation> {
        // The status guard repeats the pending precondition in storage so a
        // racing second response loses cleanly.
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            UPDATE event_invitations
            SET status = $2, last_viewed_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING id, event_id, inviter_id, invitee_id, batch_id, status, expires_at, last_viewed_at, created_at
            "#
        )
        .bind(invitation_id)
        .bind(status)
        .bind(viewed_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatherHubError::NotPending { invitation_id })?;

        Ok(invitation)
    }

    async fn mark_viewed(&self, invitation_id: i64, viewed_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE event_invitations SET last_viewed_at = $2 WHERE id = $1")
            .bind(invitation_id)
            .bind(viewed_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
