//! Services module
//!
//! This module contains the core business logic services

pub mod cache;
pub mod calendar;
pub mod capacity;
pub mod effects;
pub mod invitation;
pub mod notification;
pub mod registration;

// Re-export commonly used services
pub use cache::CacheService;
pub use calendar::{CalendarSink, CalendarSyncPayload, CalendarSyncService, CalendarSyncStatus};
pub use capacity::CapacityDecision;
pub use effects::{Effect, EffectDispatcher};
pub use invitation::{
    BatchOutcome, InvitationService, InvitationStore, MemberDirectory, RegistrationAttempt,
    RespondOutcome,
};
pub use notification::{
    LogNotificationSink, Notification, NotificationKind, NotificationSink,
    WebhookNotificationSink,
};
pub use registration::{
    CancellationOutcome, Placement, RegistrationLedger, RegistrationOutcome, RegistrationService,
};

use std::sync::Arc;

use crate::config::Settings;
use crate::database::{DatabasePool, DatabaseService};
use crate::models::InvitationResponse;
use crate::utils::errors::Result;

/// Service factory wiring the workflows, their persistence seams, and the
/// effect dispatcher together.
#[derive(Clone)]
pub struct ServiceFactory {
    pub database: DatabaseService,
    pub registration_service: RegistrationService,
    pub invitation_service: InvitationService,
    pub dispatcher: EffectDispatcher,
    pool: DatabasePool,
    settings: Settings,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: Settings, pool: DatabasePool) -> Result<Self> {
        settings.validate()?;

        let database = DatabaseService::new(pool.clone());

        let ledger: Arc<dyn RegistrationLedger> = Arc::new(database.attendance.clone());
        let store: Arc<dyn InvitationStore> = Arc::new(database.invitations.clone());
        let directory: Arc<dyn MemberDirectory> = Arc::new(database.profiles.clone());

        let registration_service = RegistrationService::new(ledger.clone());
        let invitation_service = InvitationService::new(
            store,
            directory.clone(),
            ledger,
            registration_service.clone(),
            settings.invitations.clone(),
        );

        let notifications: Arc<dyn NotificationSink> =
            if settings.notifications.webhook_url.is_some() {
                Arc::new(WebhookNotificationSink::new(settings.notifications.clone())?)
            } else {
                Arc::new(LogNotificationSink::new())
            };

        let calendar: Option<Arc<dyn CalendarSink>> =
            match (settings.features.calendar_sync, settings.calendar.clone()) {
                (true, Some(config)) => Some(Arc::new(CalendarSyncService::new(config)?)),
                _ => None,
            };

        let cache = if settings.features.read_cache {
            Some(CacheService::new(settings.redis.clone())?)
        } else {
            None
        };

        let dispatcher = EffectDispatcher::new(notifications, calendar, cache, directory);

        Ok(Self {
            database,
            registration_service,
            invitation_service,
            dispatcher,
            pool,
            settings,
        })
    }

    /// Register a member for an event and dispatch the committed effects.
    pub async fn register(
        &self,
        event_id: i64,
        actor: Option<i64>,
    ) -> Result<RegistrationOutcome> {
        let mut outcome = self.registration_service.register(event_id, actor).await?;
        self.dispatcher
            .dispatch(std::mem::take(&mut outcome.effects))
            .await;
        Ok(outcome)
    }

    /// Cancel a member's registration and dispatch the committed effects.
    pub async fn cancel(
        &self,
        event_id: i64,
        actor: Option<i64>,
    ) -> Result<CancellationOutcome> {
        let mut outcome = self.registration_service.cancel(event_id, actor).await?;
        self.dispatcher
            .dispatch(std::mem::take(&mut outcome.effects))
            .await;
        Ok(outcome)
    }

    /// Submit a bulk invitation batch.
    pub async fn submit_batch(
        &self,
        event_id: i64,
        creator: Option<i64>,
        raw_addressees: &str,
        message: Option<String>,
        expiration_days: Option<i64>,
    ) -> Result<BatchOutcome> {
        self.invitation_service
            .submit_batch(event_id, creator, raw_addressees, message, expiration_days)
            .await
    }

    /// Answer an invitation and dispatch the committed effects.
    pub async fn respond(
        &self,
        invitation_id: i64,
        response: InvitationResponse,
    ) -> Result<RespondOutcome> {
        let mut outcome = self
            .invitation_service
            .respond(invitation_id, response)
            .await?;
        self.dispatcher
            .dispatch(std::mem::take(&mut outcome.effects))
            .await;
        Ok(outcome)
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = crate::database::health_check(&self.pool).await.is_ok();

        ServiceHealthStatus {
            database_healthy,
            calendar_enabled: self.settings.features.calendar_sync
                && self.settings.calendar.is_some(),
            webhook_configured: self.settings.notifications.webhook_url.is_some(),
            cache_enabled: self.settings.features.read_cache,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub calendar_enabled: bool,
    pub webhook_configured: bool,
    pub cache_enabled: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }

        issues
    }
}
