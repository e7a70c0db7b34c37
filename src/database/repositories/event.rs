//! Event repository implementation

use chrono::Utc;
use sqlx::PgPool;

use crate::models::{
    AttendanceRecord, CreateEventRequest, Event, EventStatus, RegistrationKind, UpdateEventRequest,
};
use crate::utils::errors::GatherHubError;

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, request: CreateEventRequest) -> Result<Event, GatherHubError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (title, description, starts_at, location, capacity, waitlist_enabled, status, external_calendar_id, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, title, description, starts_at, location, capacity, attendee_count, waitlist_enabled, status, external_calendar_id, created_by, created_at, updated_at
            "#
        )
        .bind(request.title)
        .bind(request.description)
        .bind(request.starts_at)
        .bind(request.location)
        .bind(request.capacity)
        .bind(request.waitlist_enabled)
        .bind(EventStatus::Draft)
        .bind(request.external_calendar_id)
        .bind(request.created_by)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, GatherHubError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, title, description, starts_at, location, capacity, attendee_count, waitlist_enabled, status, external_calendar_id, created_by, created_at, updated_at FROM events WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Update event details. Cancelled events are terminal and refuse
    /// further changes.
    pub async fn update(
        &self,
        id: i64,
        request: UpdateEventRequest,
    ) -> Result<Event, GatherHubError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                starts_at = COALESCE($4, starts_at),
                location = COALESCE($5, location),
                capacity = COALESCE($6, capacity),
                waitlist_enabled = COALESCE($7, waitlist_enabled),
                external_calendar_id = COALESCE($8, external_calendar_id),
                updated_at = $9
            WHERE id = $1 AND status <> 'cancelled'
            RETURNING id, title, description, starts_at, location, capacity, attendee_count, waitlist_enabled, status, external_calendar_id, created_by, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.starts_at)
        .bind(request.location)
        .bind(request.capacity)
        .bind(request.waitlist_enabled)
        .bind(request.external_calendar_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match event {
            Some(event) => Ok(event),
            None => match self.find_by_id(id).await? {
                Some(_) => Err(GatherHubError::EventCancelled { event_id: id }),
                None => Err(GatherHubError::EventNotFound { event_id: id }),
            },
        }
    }

    /// Publish a draft event
    pub async fn publish(&self, id: i64) -> Result<Event, GatherHubError> {
        self.set_status(id, EventStatus::Published).await
    }

    /// Cancel an event. The transition is terminal.
    pub async fn cancel(&self, id: i64) -> Result<Event, GatherHubError> {
        self.set_status(id, EventStatus::Cancelled).await
    }

    async fn set_status(&self, id: i64, status: EventStatus) -> Result<Event, GatherHubError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status <> 'cancelled'
            RETURNING id, title, description, starts_at, location, capacity, attendee_count, waitlist_enabled, status, external_calendar_id, created_by, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match event {
            Some(event) => Ok(event),
            None => match self.find_by_id(id).await? {
                Some(_) => Err(GatherHubError::EventCancelled { event_id: id }),
                None => Err(GatherHubError::EventNotFound { event_id: id }),
            },
        }
    }

    /// Get upcoming published events
    pub async fn get_upcoming_events(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<Event>, GatherHubError> {
        let limit = limit.unwrap_or(50);
        let events = sqlx::query_as::<_, Event>(
            "SELECT id, title, description, starts_at, location, capacity, attendee_count, waitlist_enabled, status, external_calendar_id, created_by, created_at, updated_at FROM events WHERE starts_at > NOW() AND status = 'published' ORDER BY starts_at ASC LIMIT $1"
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Get registered attendees for an event, in registration order
    pub async fn get_registered_attendees(
        &self,
        event_id: i64,
    ) -> Result<Vec<AttendanceRecord>, GatherHubError> {
        let attendees = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT id, event_id, user_id, kind, waitlist_position, created_at FROM event_attendees WHERE event_id = $1 AND kind = $2 ORDER BY created_at ASC"
        )
        .bind(event_id)
        .bind(RegistrationKind::Registered)
        .fetch_all(&self.pool)
        .await?;

        Ok(attendees)
    }

    /// Get the waitlist for an event, in position order
    pub async fn get_waitlist(
        &self,
        event_id: i64,
    ) -> Result<Vec<AttendanceRecord>, GatherHubError> {
        let waitlist = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT id, event_id, user_id, kind, waitlist_position, created_at FROM event_attendees WHERE event_id = $1 AND kind = $2 ORDER BY waitlist_position ASC"
        )
        .bind(event_id)
        .bind(RegistrationKind::Waitlist)
        .fetch_all(&self.pool)
        .await?;

        Ok(waitlist)
    }

    /// Get events a user holds an attendance record for
    pub async fn get_user_events(&self, user_id: i64) -> Result<Vec<Event>, GatherHubError> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT e.id, e.title, e.description, e.starts_at, e.location, e.capacity, e.attendee_count, e.waitlist_enabled, e.status, e.external_calendar_id, e.created_by, e.created_at, e.updated_at
            FROM events e
            INNER JOIN event_attendees ea ON e.id = ea.event_id
            WHERE ea.user_id = $1 AND e.status <> 'cancelled'
            ORDER BY e.starts_at ASC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Count total events
    pub async fn count(&self) -> Result<i64, GatherHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
