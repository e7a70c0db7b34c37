//! Registration and waitlist integration scenarios

mod helpers;

use anyhow::Result;
use assert_matches::assert_matches;

use gatherhub::models::RegistrationKind;
use gatherhub::services::{NotificationKind, Placement};
use gatherhub::GatherHubError;
use helpers::TestPlatform;

#[tokio::test]
async fn full_event_lifecycle_with_waitlist_churn() -> Result<()> {
    let platform = TestPlatform::new();
    platform.seed_event(1, Some(2), true);

    // Fill the event, then overflow onto the waitlist.
    for user in [10, 11] {
        let outcome = platform.registration.register(1, Some(user)).await?;
        assert_eq!(outcome.placement, Placement::Registered);
    }
    for (user, expected_position) in [(12, 1), (13, 2), (14, 3)] {
        let outcome = platform.registration.register(1, Some(user)).await?;
        assert_eq!(
            outcome.placement,
            Placement::Waitlisted {
                position: expected_position
            }
        );
    }

    // A registered attendee leaves: the head is promoted and the rest of
    // the waitlist closes ranks.
    let cancellation = platform.registration.cancel(1, Some(10)).await?;
    let promoted = cancellation.promoted.expect("head should be promoted");
    assert_eq!(promoted.user_id, 12);
    assert_eq!(promoted.kind, RegistrationKind::Registered);
    assert_eq!(platform.ledger.waitlist_positions(1), vec![1, 2]);

    // A mid-waitlist entrant leaves: later positions re-pack, no promotion.
    let cancellation = platform.registration.cancel(1, Some(13)).await?;
    assert!(cancellation.promoted.is_none());
    assert_eq!(platform.ledger.waitlist_positions(1), vec![1]);

    // The registered count stayed at capacity throughout.
    assert_eq!(platform.ledger.registered_count(1), 2);
    Ok(())
}

#[tokio::test]
async fn promotion_notifies_the_promoted_member() -> Result<()> {
    let platform = TestPlatform::new();
    platform.seed_event(1, Some(1), true);
    platform.seed_member(10, "leaver@x.com");
    platform.seed_member(11, "promoted@x.com");

    platform.registration.register(1, Some(10)).await?;
    platform.registration.register(1, Some(11)).await?;

    let outcome = platform.registration.cancel(1, Some(10)).await?;
    platform.dispatcher.dispatch(outcome.effects).await;

    let delivered = platform.notifications.delivered();
    // One registration_update for the promoted member, one cancellation
    // for the leaver.
    assert!(delivered
        .iter()
        .any(|n| n.user_id == 11
            && n.kind == NotificationKind::RegistrationUpdate
            && n.status == "registered"));
    assert!(delivered
        .iter()
        .any(|n| n.user_id == 10 && n.kind == NotificationKind::Cancellation));
    Ok(())
}

#[tokio::test]
async fn linked_event_syncs_attendance_to_calendar() -> Result<()> {
    let platform = TestPlatform::new();
    let mut event = gatherhub::testing::fixtures::published_event(1, Some(5), false);
    event.external_calendar_id = Some("cal_spring_social".to_string());
    platform.ledger.insert_event(event);
    platform.seed_member(10, "dancer@x.com");

    let outcome = platform.registration.register(1, Some(10)).await?;
    platform.dispatcher.dispatch(outcome.effects).await;

    let synced = platform.calendar.synced();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].external_calendar_id, "cal_spring_social");
    assert_eq!(synced[0].user_contact, "dancer@x.com");
    Ok(())
}

#[tokio::test]
async fn registered_count_never_exceeds_capacity_under_churn() -> Result<()> {
    let platform = TestPlatform::new();
    platform.seed_event(1, Some(3), true);

    for user in 100..120 {
        platform.registration.register(1, Some(user)).await?;
    }
    assert_eq!(platform.ledger.registered_count(1), 3);

    // Cancel a mix of registered and waitlisted members.
    for user in [100, 105, 102, 111] {
        platform.registration.cancel(1, Some(user)).await?;
        assert!(platform.ledger.registered_count(1) <= 3);

        let positions = platform.ledger.waitlist_positions(1);
        let expected: Vec<i32> = (1..=positions.len() as i32).collect();
        assert_eq!(positions, expected);
    }

    // Promotions backfilled every freed registered slot.
    assert_eq!(platform.ledger.registered_count(1), 3);
    Ok(())
}

#[tokio::test]
async fn cancelled_event_refuses_all_registration_changes() -> Result<()> {
    let platform = TestPlatform::new();
    let mut event = gatherhub::testing::fixtures::published_event(1, Some(5), true);
    event.status = gatherhub::models::EventStatus::Cancelled;
    platform.ledger.insert_event(event);

    assert_matches!(
        platform.registration.register(1, Some(10)).await,
        Err(GatherHubError::EventCancelled { event_id: 1 })
    );
    assert_eq!(platform.ledger.record_count(1), 0);
    Ok(())
}
