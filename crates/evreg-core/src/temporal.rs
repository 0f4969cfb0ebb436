//! # Temporal Types
//!
//! UTC-only timestamp type for the registry. Record creation times and grant
//! times are stored in UTC with second-level precision and a `Z` suffix in
//! serialized form. Local time conversion is a presentation concern.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC timestamp truncated to second precision.
///
/// Serializes to ISO 8601 format with `Z` suffix (e.g., `2026-01-15T12:00:00Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] for malformed input or a
    /// non-`Z` offset (even `+00:00`).
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must use Z suffix (UTC only)".to_string(),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_datetime(dt.with_timezone(&Utc)))
    }

    /// Access the underlying `chrono::DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Seconds since the Unix epoch.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_canonical_string(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}
