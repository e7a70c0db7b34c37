//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::database::{
    AttendanceRepository, DatabasePool, EventRepository, InvitationRepository, ProfileRepository,
};
use crate::models::{CreateEventRequest, CreateProfileRequest, Event, Profile};
use crate::utils::errors::{GatherHubError, Result};

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub events: EventRepository,
    pub attendance: AttendanceRepository,
    pub invitations: InvitationRepository,
    pub profiles: ProfileRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            attendance: AttendanceRepository::new(pool.clone()),
            invitations: InvitationRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool),
        }
    }

    /// Initialize a member profile, reusing an existing one for the same
    /// contact email.
    pub async fn initialize_profile(
        &self,
        email: String,
        display_name: Option<String>,
    ) -> Result<Profile> {
        if let Some(existing) = self.profiles.find_by_email(&email).await? {
            return Ok(existing);
        }

        self.profiles
            .create(CreateProfileRequest {
                email,
                display_name,
            })
            .await
    }

    /// Create a new event owned by an organizer
    pub async fn create_event(&self, request: CreateEventRequest) -> Result<Event> {
        if let Some(capacity) = request.capacity {
            if capacity <= 0 {
                return Err(GatherHubError::InvalidInput(
                    "Event capacity must be a positive number".to_string(),
                ));
            }
        }

        self.events.create(request).await
    }
}
