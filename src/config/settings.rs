//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub notifications: NotificationConfig,
    pub calendar: Option<CalendarConfig>,
    pub invitations: InvitationConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Notification webhook sink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
    pub timeout_seconds: u64,
}

/// External calendar sink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalendarConfig {
    pub api_url: String,
    pub timeout_seconds: u64,
}

/// Invitation processing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvitationConfig {
    pub default_expiration_days: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    pub max_files: u32,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub calendar_sync: bool,
    pub read_cache: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("GATHERHUB"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::GatherHubError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/gatherhub".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "gatherhub:".to_string(),
                ttl_seconds: 3600,
            },
            notifications: NotificationConfig {
                webhook_url: None,
                timeout_seconds: 10,
            },
            calendar: None,
            invitations: InvitationConfig {
                default_expiration_days: 7,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/gatherhub".to_string(),
                max_files: 5,
            },
            features: FeaturesConfig {
                calendar_sync: false,
                read_cache: true,
            },
        }
    }
}
