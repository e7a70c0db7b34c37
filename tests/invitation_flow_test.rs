//! Batch invitation and response integration scenarios

mod helpers;

use anyhow::Result;
use assert_matches::assert_matches;

use gatherhub::models::{BatchStatus, InvitationResponse, InvitationStatus};
use gatherhub::services::{Placement, RegistrationAttempt};
use gatherhub::GatherHubError;
use helpers::TestPlatform;

#[tokio::test]
async fn batch_resolves_members_and_reports_counts() -> Result<()> {
    let platform = TestPlatform::new();
    platform.seed_event(1, Some(10), true);
    platform.seed_member(101, "a@x.com");
    platform.seed_member(102, "c@x.com");

    let outcome = platform
        .invitations
        .submit_batch(1, Some(1), "a@x.com, b@x.com,\nc@x.com", None, None)
        .await?;

    assert_eq!(outcome.batch.total, 3);
    assert_eq!(outcome.batch.sent, 2);
    assert_eq!(outcome.batch.failed, 1);
    assert_eq!(outcome.batch.status, BatchStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn invited_members_accept_into_a_filling_event() -> Result<()> {
    let platform = TestPlatform::new();
    // Two slots, waitlist on: the third acceptance lands on the waitlist.
    platform.seed_event(1, Some(2), true);
    let emails = platform.seed_members(201, 3);

    let outcome = platform
        .invitations
        .submit_batch(1, Some(1), &emails.join(",\n"), None, Some(10))
        .await?;
    assert_eq!(outcome.batch.sent, 3);

    let mut placements = Vec::new();
    for invitation in &outcome.invitations {
        let responded = platform
            .invitations
            .respond(invitation.id, InvitationResponse::Accepted)
            .await?;
        assert_eq!(responded.invitation.status, InvitationStatus::Accepted);
        match responded.registration {
            RegistrationAttempt::Completed { placement, .. } => placements.push(placement),
            other => panic!("expected a completed registration, got {:?}", other),
        }
    }

    assert_eq!(
        placements,
        vec![
            Placement::Registered,
            Placement::Registered,
            Placement::Waitlisted { position: 1 }
        ]
    );
    assert_eq!(platform.ledger.registered_count(1), 2);
    Ok(())
}

#[tokio::test]
async fn rejection_leaves_the_ledger_alone() -> Result<()> {
    let platform = TestPlatform::new();
    platform.seed_event(1, None, false);
    platform.seed_member(101, "a@x.com");

    let outcome = platform
        .invitations
        .submit_batch(1, Some(1), "a@x.com", None, None)
        .await?;
    let responded = platform
        .invitations
        .respond(outcome.invitations[0].id, InvitationResponse::Rejected)
        .await?;

    assert_eq!(responded.invitation.status, InvitationStatus::Rejected);
    assert_matches!(responded.registration, RegistrationAttempt::NotAttempted);
    assert_eq!(platform.ledger.record_count(1), 0);

    // A rejected invitation no longer blocks a fresh one.
    let second = platform
        .invitations
        .submit_batch(1, Some(1), "a@x.com", None, None)
        .await?;
    assert_eq!(second.batch.sent, 1);
    Ok(())
}

#[tokio::test]
async fn accept_after_direct_registration_is_idempotent() -> Result<()> {
    let platform = TestPlatform::new();
    platform.seed_event(1, Some(5), true);
    platform.seed_member(101, "a@x.com");

    let outcome = platform
        .invitations
        .submit_batch(1, Some(1), "a@x.com", None, None)
        .await?;

    // The invitee registers directly before answering the invitation.
    platform.registration.register(1, Some(101)).await?;

    let responded = platform
        .invitations
        .respond(outcome.invitations[0].id, InvitationResponse::Accepted)
        .await?;
    assert_matches!(responded.registration, RegistrationAttempt::AlreadyRegistered);
    assert_eq!(platform.ledger.record_count(1), 1);
    Ok(())
}

#[tokio::test]
async fn expired_invitation_cannot_be_answered() -> Result<()> {
    let platform = TestPlatform::new();
    platform.seed_event(1, None, false);
    platform.seed_member(101, "a@x.com");

    let outcome = platform
        .invitations
        .submit_batch(1, Some(1), "a@x.com", None, None)
        .await?;
    let invitation_id = outcome.invitations[0].id;
    platform
        .store
        .set_expiration(invitation_id, chrono::Utc::now() - chrono::Duration::days(1));

    assert_matches!(
        platform
            .invitations
            .respond(invitation_id, InvitationResponse::Accepted)
            .await,
        Err(GatherHubError::Expired { .. })
    );
    Ok(())
}

#[tokio::test]
async fn accepted_invitation_dispatches_registration_notification() -> Result<()> {
    let platform = TestPlatform::new();
    platform.seed_event(1, Some(5), true);
    platform.seed_member(101, "a@x.com");

    let outcome = platform
        .invitations
        .submit_batch(1, Some(1), "a@x.com", None, None)
        .await?;
    let responded = platform
        .invitations
        .respond(outcome.invitations[0].id, InvitationResponse::Accepted)
        .await?;
    platform.dispatcher.dispatch(responded.effects).await;

    let delivered = platform.notifications.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].user_id, 101);
    assert_eq!(delivered[0].status, "registered");
    Ok(())
}
