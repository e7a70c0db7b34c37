//! Capacity policy
//!
//! Pure decision logic for whether a new registrant is accepted outright,
//! placed on the waitlist, or rejected. No I/O; callable from anywhere.

use serde::{Deserialize, Serialize};

/// Outcome of a capacity check for one prospective registrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityDecision {
    Accepted,
    Waitlisted,
    Rejected,
}

/// Decide the placement of a new registrant.
///
/// `capacity` of `None` means unlimited. The decision is made from the
/// attendee count the caller read from persisted state; the ledger
/// re-checks the bound transactionally when the record is written.
pub fn decide(
    current_attendees: i32,
    capacity: Option<i32>,
    waitlist_enabled: bool,
) -> CapacityDecision {
    match capacity {
        None => CapacityDecision::Accepted,
        Some(max) if current_attendees < max => CapacityDecision::Accepted,
        Some(_) if waitlist_enabled => CapacityDecision::Waitlisted,
        Some(_) => CapacityDecision::Rejected,
    }
}
