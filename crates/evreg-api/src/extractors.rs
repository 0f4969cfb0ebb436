//! # Extractors & Validation
//!
//! The [`Validate`] trait for request DTOs, JSON body extraction with
//! uniform error mapping, and parsers for path segments.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use evreg_core::{EvidenceId, Identity};

use crate::error::AppError;

/// Request types that check business rules beyond deserialization.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse an evidence id path segment.
pub fn parse_evidence_id(raw: &str) -> Result<EvidenceId, AppError> {
    Ok(raw.parse::<EvidenceId>()?)
}

/// Parse an identity path segment or body field.
pub fn parse_identity(raw: &str) -> Result<Identity, AppError> {
    Ok(Identity::new(raw)?)
}
