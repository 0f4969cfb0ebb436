//! # Authentication Middleware
//!
//! Resolves the caller's [`Identity`] for every request. The registry
//! trusts this identity as given; everything it authorizes (ownership,
//! self-requests) is decided from it.
//!
//! ## Token Format
//!
//! ```text
//! Authorization: Bearer {identity}:{secret}
//! ```
//!
//! The identity is everything before the last `:`; the secret after it is
//! compared against the configured secret in constant time.
//!
//! When no secret is configured (development mode) the identity is taken
//! from the `X-Caller-Identity` header instead. A request without any
//! identity still passes the middleware; handlers that need a caller reject
//! it with 401 through the [`CallerIdentity`] extractor.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use evreg_core::Identity;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Development-mode header carrying the caller identity.
pub const CALLER_HEADER: &str = "x-caller-identity";

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// The authenticated caller, injected into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub Identity);

impl CallerIdentity {
    /// The caller's identity.
    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token of the form `{identity}:{secret}`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<Identity, String> {
    let (identity, secret) = provided
        .rsplit_once(':')
        .ok_or_else(|| "invalid token format, expected {identity}:{secret}".to_string())?;
    if !constant_time_eq(secret, expected_secret) {
        return Err("invalid bearer token".into());
    }
    Identity::new(identity).map_err(|e| format!("invalid identity in token: {e}"))
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Resolve the caller identity and inject it into request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request.extensions().get::<AuthConfig>().cloned();

    match config {
        Some(AuthConfig {
            secret: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(value) => match value.strip_prefix("Bearer ") {
                    Some(provided) => match parse_bearer_token(provided, expected) {
                        Ok(identity) => {
                            request.extensions_mut().insert(CallerIdentity(identity));
                            next.run(request).await
                        }
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed");
                            unauthorized_response(&msg)
                        }
                    },
                    None => {
                        tracing::warn!("authentication failed: non-Bearer authorization scheme");
                        unauthorized_response("authorization header must use Bearer scheme")
                    }
                },
                None => next.run(request).await,
            }
        }
        _ => {
            let header_identity = request
                .headers()
                .get(CALLER_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(Identity::new);
            match header_identity {
                Some(Ok(identity)) => {
                    request.extensions_mut().insert(CallerIdentity(identity));
                    next.run(request).await
                }
                Some(Err(e)) => unauthorized_response(&format!("invalid caller identity: {e}")),
                None => next.run(request).await,
            }
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
