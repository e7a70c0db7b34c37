//! Effect dispatcher
//!
//! The registration and invitation workflows return committed results plus
//! a list of effects to attempt. This dispatcher executes those effects
//! with independent failure isolation: a failed notification, calendar
//! sync, or cache invalidation is logged and swallowed, never undoing the
//! state change that produced it.

use std::sync::Arc;

use tracing::debug;

use crate::services::cache::CacheService;
use crate::services::calendar::{CalendarSink, CalendarSyncPayload, CalendarSyncStatus};
use crate::services::invitation::MemberDirectory;
use crate::services::notification::{Notification, NotificationSink};
use crate::utils::logging::log_effect_failure;

/// A side effect to attempt after a workflow operation has committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Notify(Notification),
    CalendarSync {
        external_calendar_id: String,
        user_id: i64,
        status: CalendarSyncStatus,
    },
    InvalidateEventCache {
        event_id: i64,
    },
}

/// Executes effects emitted by the workflows.
#[derive(Clone)]
pub struct EffectDispatcher {
    notifications: Arc<dyn NotificationSink>,
    calendar: Option<Arc<dyn CalendarSink>>,
    cache: Option<CacheService>,
    directory: Arc<dyn MemberDirectory>,
}

impl EffectDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationSink>,
        calendar: Option<Arc<dyn CalendarSink>>,
        cache: Option<CacheService>,
        directory: Arc<dyn MemberDirectory>,
    ) -> Self {
        Self {
            notifications,
            calendar,
            cache,
            directory,
        }
    }

    /// Attempt every effect. Effects are independent; all are attempted
    /// concurrently and none can fail the call.
    pub async fn dispatch(&self, effects: Vec<Effect>) {
        let attempts = effects.into_iter().map(|effect| self.dispatch_one(effect));
        futures::future::join_all(attempts).await;
    }

    async fn dispatch_one(&self, effect: Effect) {
        match effect {
            Effect::Notify(notification) => {
                if let Err(e) = self.notifications.deliver(&notification).await {
                    log_effect_failure("notification", &e.to_string());
                }
            }
            Effect::CalendarSync {
                external_calendar_id,
                user_id,
                status,
            } => {
                let Some(calendar) = &self.calendar else {
                    debug!(
                        calendar_id = %external_calendar_id,
                        "Calendar sync disabled; skipping"
                    );
                    return;
                };

                let contact = match self.directory.contact_for(user_id).await {
                    Ok(Some(contact)) => contact,
                    Ok(None) => {
                        log_effect_failure(
                            "calendar_sync",
                            &format!("no contact on file for user {}", user_id),
                        );
                        return;
                    }
                    Err(e) => {
                        log_effect_failure("calendar_sync", &e.to_string());
                        return;
                    }
                };

                let payload = CalendarSyncPayload {
                    external_calendar_id,
                    user_contact: contact,
                    status,
                };
                if let Err(e) = calendar.sync_attendance(&payload).await {
                    log_effect_failure("calendar_sync", &e.to_string());
                }
            }
            Effect::InvalidateEventCache { event_id } => {
                let Some(cache) = &self.cache else {
                    return;
                };
                if let Err(e) = cache.invalidate_event(event_id).await {
                    log_effect_failure("cache_invalidation", &e.to_string());
                }
            }
        }
    }
}
