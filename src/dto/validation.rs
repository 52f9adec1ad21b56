//! Validation helpers for DTOs.

use std::time::SystemTime;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use validator::ValidationError;

/// Validates that a timestamp query parameter is RFC 3339 (e.g. `2025-03-01T18:00:00Z`).
pub fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    parse_timestamp(value).map(|_| ()).ok_or_else(|| {
        let mut err = ValidationError::new("timestamp_format");
        err.message = Some(format!("`{value}` is not an RFC 3339 timestamp").into());
        err
    })
}

/// Parse an RFC 3339 timestamp into a [`SystemTime`].
pub fn parse_timestamp(value: &str) -> Option<SystemTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .map(SystemTime::from)
}
