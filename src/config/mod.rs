//! Configuration module
//!
//! Settings loading, structure, and validation

pub mod settings;
pub mod validation;

// Re-export commonly used configuration types
pub use settings::{
    CalendarConfig, DatabaseConfig, FeaturesConfig, InvitationConfig, LoggingConfig,
    NotificationConfig, RedisConfig, Settings,
};
