//! Shared test harness for integration tests

use std::sync::Arc;

use fake::faker::internet::en::SafeEmail;
use fake::Fake;

use gatherhub::config::InvitationConfig;
use gatherhub::services::{
    EffectDispatcher, InvitationService, RegistrationService,
};
use gatherhub::testing::{
    fixtures, InMemoryDirectory, InMemoryInvitationStore, InMemoryLedger,
    RecordingCalendarSink, RecordingNotificationSink,
};

/// A fully wired in-memory platform: workflows, stores, and recording
/// sinks behind a dispatcher.
pub struct TestPlatform {
    pub registration: RegistrationService,
    pub invitations: InvitationService,
    pub dispatcher: EffectDispatcher,
    pub ledger: Arc<InMemoryLedger>,
    pub store: Arc<InMemoryInvitationStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub notifications: Arc<RecordingNotificationSink>,
    pub calendar: Arc<RecordingCalendarSink>,
}

impl TestPlatform {
    pub fn new() -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let store = Arc::new(InMemoryInvitationStore::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let notifications = Arc::new(RecordingNotificationSink::new());
        let calendar = Arc::new(RecordingCalendarSink::new());

        let registration = RegistrationService::new(ledger.clone());
        let invitations = InvitationService::new(
            store.clone(),
            directory.clone(),
            ledger.clone(),
            registration.clone(),
            InvitationConfig {
                default_expiration_days: 7,
            },
        );
        let dispatcher = EffectDispatcher::new(
            notifications.clone(),
            Some(calendar.clone()),
            None,
            directory.clone(),
        );

        Self {
            registration,
            invitations,
            dispatcher,
            ledger,
            store,
            directory,
            notifications,
            calendar,
        }
    }

    /// Seed a published event.
    pub fn seed_event(&self, id: i64, capacity: Option<i32>, waitlist_enabled: bool) {
        self.ledger
            .insert_event(fixtures::published_event(id, capacity, waitlist_enabled));
    }

    /// Seed one member with a known contact email.
    pub fn seed_member(&self, id: i64, email: &str) {
        self.directory.insert_profile(id, email);
    }

    /// Seed `count` members with generated contact emails, returning them.
    pub fn seed_members(&self, first_id: i64, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                let generated: String = SafeEmail().fake();
                let email = format!("m{}.{}", i, generated);
                self.directory.insert_profile(first_id + i as i64, &email);
                email
            })
            .collect()
    }
}
