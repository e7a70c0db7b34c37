//! Database repositories
//!
//! Table-level data access for the core entities

pub mod attendance;
pub mod event;
pub mod invitation;
pub mod profile;

// Re-export repository types
pub use attendance::AttendanceRepository;
pub use event::EventRepository;
pub use invitation::InvitationRepository;
pub use profile::ProfileRepository;
