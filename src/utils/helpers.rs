//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the crate.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Bounds for invitation expiration, in days.
pub const MIN_EXPIRATION_DAYS: i64 = 1;
pub const MAX_EXPIRATION_DAYS: i64 = 30;

/// Split a raw addressee block into individual addressees.
///
/// Entries are separated by commas and/or newlines, surrounding whitespace
/// is trimmed, and empty entries are discarded. Duplicates are kept: the
/// batch total counts raw entries.
pub fn parse_addressees(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Clamp an invitation expiration request to the allowed window.
pub fn clamp_expiration_days(days: i64) -> i64 {
    days.clamp(MIN_EXPIRATION_DAYS, MAX_EXPIRATION_DAYS)
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
    });
    re.is_match(email)
}

/// Format a timestamp for display
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Format a timestamp in the compact UTC form used by calendar exports.
pub fn format_calendar_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y%m%dT%H%M%SZ").to_string()
}
