//! # Error Hierarchy
//!
//! Structured error types shared across the workspace, built with `thiserror`.
//! Registry-specific failures (not found, unauthorized, invalid transition)
//! live in `evreg-state`; this module only covers what the leaf types can
//! reject on their own.

use thiserror::Error;

/// Top-level error type for the foundational crate.
#[derive(Error, Debug)]
pub enum EvregError {
    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes.
///
/// Each variant carries the rejected input so that operators can see exactly
/// what was supplied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identity string was empty after trimming.
    #[error("invalid identity: must be non-empty")]
    EmptyIdentity,

    /// Identity exceeds the maximum permitted length.
    #[error("invalid identity: {len} bytes exceeds the limit of {max}")]
    IdentityTooLong {
        /// Length of the rejected input in bytes.
        len: usize,
        /// Maximum permitted length in bytes.
        max: usize,
    },

    /// Identity contains whitespace or control characters.
    #[error("invalid identity: \"{0}\" contains whitespace or control characters")]
    IdentityCharacters(String),

    /// Evidence identifiers start at 1.
    #[error("invalid evidence id: \"{0}\" (expected a positive integer)")]
    InvalidEvidenceId(String),

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
