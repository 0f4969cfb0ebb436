//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps registry and validation errors to HTTP status codes with a JSON
//! body carrying a machine-readable code. Internal details never reach the
//! client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use evreg_state::{InvalidStateReason, RegistryError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context for client errors, e.g. `{"reason": "not-pending"}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown evidence record (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Path or body field failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is not the owner of the record (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Transition not legal from the user's current permission state (409).
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        reason: Option<InvalidStateReason>,
    },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Conflict {
                reason: Some(reason),
                ..
            } => Some(serde_json::json!({ "reason": reason.as_str() })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<evreg_core::ValidationError> for AppError {
    fn from(err: evreg_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match &err {
            RegistryError::NotFound(_) => Self::NotFound(err.to_string()),
            RegistryError::Unauthorized { .. } => Self::Forbidden(err.to_string()),
            RegistryError::InvalidState { reason, .. } => Self::Conflict {
                message: err.to_string(),
                reason: Some(*reason),
            },
            RegistryError::IdSpaceExhausted => Self::Internal(err.to_string()),
        }
    }
}
