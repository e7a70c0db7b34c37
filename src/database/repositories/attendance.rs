//! Attendance repository: the Postgres-backed registration ledger
//!
//! Every mutation runs in one transaction that first locks the event row,
//! so concurrent registrations, cancellations, and promotions for the same
//! event serialize at the persistence layer. Waitlist positions are always
//! computed from the current persisted maximum, and re-packing after a
//! removal is a single UPDATE statement.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::models::{AttendanceRecord, Event, EventStatus, RegistrationKind};
use crate::services::registration::RegistrationLedger;
use crate::utils::errors::{GatherHubError, Result};

#[derive(Debug, Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

/// Event row as seen under the transaction's lock.
#[derive(Debug, sqlx::FromRow)]
struct LockedEvent {
    status: EventStatus,
    capacity: Option<i32>,
    attendee_count: i32,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the event row for the duration of the transaction.
    async fn lock_event(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_id: i64,
    ) -> Result<LockedEvent> {
        let event = sqlx::query_as::<_, LockedEvent>(
            "SELECT status, capacity, attendee_count FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(GatherHubError::EventNotFound { event_id })?;

        Ok(event)
    }

    fn map_duplicate_pair(e: sqlx::Error, event_id: i64, user_id: i64) -> GatherHubError {
        match &e {
            sqlx::Error::Database(db)
                if db.constraint() == Some("uq_event_attendees_event_user") =>
            {
                GatherHubError::AlreadyRegistered { event_id, user_id }
            }
            _ => GatherHubError::Database(e),
        }
    }
}

#[async_trait]
impl RegistrationLedger for AttendanceRepository {
    async fn find_event(&self, event_id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, title, description, starts_at, location, capacity, attendee_count, waitlist_enabled, status, external_calendar_id, created_by, created_at, updated_at FROM events WHERE id = $1"
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn find_record(
        &self,
        event_id: i64,
        user_id: i64,
    ) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT id, event_id, user_id, kind, waitlist_position, created_at FROM event_attendees WHERE event_id = $1 AND user_id = $2"
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn add_registered(&self, event_id: i64, user_id: i64) -> Result<AttendanceRecord> {
        let mut tx = self.pool.begin().await?;

        let event = self.lock_event(&mut tx, event_id).await?;
        if event.status == EventStatus::Cancelled {
            return Err(GatherHubError::EventCancelled { event_id });
        }
        if let Some(capacity) = event.capacity {
            if event.attendee_count >= capacity {
                return Err(GatherHubError::EventFull { event_id });
            }
        }

        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO event_attendees (event_id, user_id, kind, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, event_id, user_id, kind, waitlist_position, created_at
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(RegistrationKind::Registered)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Self::map_duplicate_pair(e, event_id, user_id))?;

        sqlx::query(
            "UPDATE events SET attendee_count = attendee_count + 1, updated_at = $2 WHERE id = $1",
        )
        .bind(event_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn add_waitlisted(&self, event_id: i64, user_id: i64) -> Result<AttendanceRecord> {
        let mut tx = self.pool.begin().await?;

        let event = self.lock_event(&mut tx, event_id).await?;
        if event.status == EventStatus::Cancelled {
            return Err(GatherHubError::EventCancelled { event_id });
        }

        // Next position from the current persisted maximum, under the
        // event lock so concurrent joins cannot compute the same slot.
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO event_attendees (event_id, user_id, kind, waitlist_position, created_at)
            VALUES ($1, $2, $3,
                    (SELECT COALESCE(MAX(waitlist_position), 0) + 1
                       FROM event_attendees
                      WHERE event_id = $1 AND kind = 'waitlist'),
                    $4)
            RETURNING id, event_id, user_id, kind, waitlist_position, created_at
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(RegistrationKind::Waitlist)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Self::map_duplicate_pair(e, event_id, user_id))?;

        tx.commit().await?;
        Ok(record)
    }

    async fn remove_record(&self, event_id: i64, user_id: i64) -> Result<AttendanceRecord> {
        let mut tx = self.pool.begin().await?;

        self.lock_event(&mut tx, event_id).await?;

        let removed = sqlx::query_as::<_, AttendanceRecord>(
            "DELETE FROM event_attendees WHERE event_id = $1 AND user_id = $2 RETURNING id, event_id, user_id, kind, waitlist_position, created_at"
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GatherHubError::NotRegistered { event_id, user_id })?;

        match removed.kind {
            RegistrationKind::Registered => {
                sqlx::query(
                    "UPDATE events SET attendee_count = attendee_count - 1, updated_at = $2 WHERE id = $1",
                )
                .bind(event_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            }
            RegistrationKind::Waitlist => {
                // Close the gap in one statement: every later entrant moves
                // up by one.
                sqlx::query(
                    "UPDATE event_attendees SET waitlist_position = waitlist_position - 1 WHERE event_id = $1 AND kind = 'waitlist' AND waitlist_position > $2"
                )
                .bind(event_id)
                .bind(removed.waitlist_position)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn promote_head(&self, event_id: i64) -> Result<Option<AttendanceRecord>> {
        let mut tx = self.pool.begin().await?;

        let event = self.lock_event(&mut tx, event_id).await?;
        if event.status == EventStatus::Cancelled {
            return Ok(None);
        }
        if let Some(capacity) = event.capacity {
            // The freed slot was retaken by a concurrent registration.
            if event.attendee_count >= capacity {
                return Ok(None);
            }
        }

        let promoted = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            UPDATE event_attendees
               SET kind = 'registered', waitlist_position = NULL
             WHERE event_id = $1 AND kind = 'waitlist' AND waitlist_position = 1
            RETURNING id, event_id, user_id, kind, waitlist_position, created_at
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(promoted) = promoted else {
            // Nothing to promote.
            return Ok(None);
        };

        sqlx::query(
            "UPDATE event_attendees SET waitlist_position = waitlist_position - 1 WHERE event_id = $1 AND kind = 'waitlist' AND waitlist_position > 1"
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE events SET attendee_count = attendee_count + 1, updated_at = $2 WHERE id = $1",
        )
        .bind(event_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(promoted))
    }
}
