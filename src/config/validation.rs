//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{GatherHubError, Result};

use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_notification_config(&settings.notifications)?;
    validate_invitation_config(&settings.invitations)?;
    validate_logging_config(&settings.logging)?;

    if let Some(ref calendar_config) = settings.calendar {
        validate_calendar_config(calendar_config)?;
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(GatherHubError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(GatherHubError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(GatherHubError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(GatherHubError::Config("Redis URL is required".to_string()));
    }

    Ok(())
}

/// Validate notification sink configuration
fn validate_notification_config(config: &super::NotificationConfig) -> Result<()> {
    if let Some(ref webhook_url) = config.webhook_url {
        url::Url::parse(webhook_url)
            .map_err(|e| GatherHubError::Config(format!("Invalid webhook URL: {}", e)))?;
    }

    if config.timeout_seconds == 0 {
        return Err(GatherHubError::Config(
            "Notification timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate calendar sink configuration
fn validate_calendar_config(config: &super::CalendarConfig) -> Result<()> {
    url::Url::parse(&config.api_url)
        .map_err(|e| GatherHubError::Config(format!("Invalid calendar API URL: {}", e)))?;

    if config.timeout_seconds == 0 {
        return Err(GatherHubError::Config(
            "Calendar timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate invitation configuration
fn validate_invitation_config(config: &super::InvitationConfig) -> Result<()> {
    if config.default_expiration_days < crate::utils::helpers::MIN_EXPIRATION_DAYS
        || config.default_expiration_days > crate::utils::helpers::MAX_EXPIRATION_DAYS
    {
        return Err(GatherHubError::Config(format!(
            "Default expiration days must be between {} and {}",
            crate::utils::helpers::MIN_EXPIRATION_DAYS,
            crate::utils::helpers::MAX_EXPIRATION_DAYS
        )));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(GatherHubError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(GatherHubError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}
