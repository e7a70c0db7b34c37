//! GatherHub core
//!
//! Community events platform core: event registration and capacity
//! management with waitlists, plus batch invitation processing. This
//! library owns the rules governing how attendees move between registered
//! and waitlisted states as capacity fills and empties, how waitlist order
//! is preserved, and how bulk invitation issuance tracks partial
//! success/failure — over a Postgres persistence layer, with notification
//! and calendar sinks consumed as fire-and-forget collaborators.

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod testing;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{GatherHubError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
