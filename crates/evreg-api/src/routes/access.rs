//! # Access Requests and Owner Decisions
//!
//! A non-owner asks for access; the owner grants or denies the pending
//! request and may later revoke a grant. Pending and granted listings are
//! owner-only. The permission query is public for the boolean; the
//! tri-state value is included only for the owner or the user themselves.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use evreg_core::{EvidenceId, Identity};
use evreg_state::{GrantEntry, PermissionState, RegistryError};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_evidence_id, parse_identity, Validate};
use crate::state::AppState;

/// Owner grants a user's pending request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantAccessRequest {
    pub user: String,
}

impl Validate for GrantAccessRequest {
    fn validate(&self) -> Result<(), String> {
        Identity::new(self.user.as_str())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// A user's access to one record.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermissionResponse {
    pub evidence_id: u64,
    pub user: String,
    pub has_permission: bool,
    /// `NONE`, `PENDING` or `GRANTED`. Omitted unless the caller is the
    /// owner or the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl PermissionResponse {
    fn new(evidence_id: EvidenceId, user: &Identity, has_permission: bool) -> Self {
        Self {
            evidence_id: evidence_id.get(),
            user: user.to_string(),
            has_permission,
            state: None,
        }
    }

    fn with_state(mut self, state: PermissionState) -> Self {
        self.state = Some(state.as_str().to_string());
        self
    }
}

/// Identities in one of a record's access collections.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IdentityListResponse {
    pub evidence_id: u64,
    pub users: Vec<String>,
}

/// One grant.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GrantResponse {
    pub evidence_id: u64,
    pub user: String,
    pub granted_at: String,
}

impl GrantResponse {
    fn new(evidence_id: EvidenceId, entry: &GrantEntry) -> Self {
        Self {
            evidence_id: evidence_id.get(),
            user: entry.user.to_string(),
            granted_at: entry.granted_at.to_canonical_string(),
        }
    }
}

/// All current grants on a record.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GrantListResponse {
    pub evidence_id: u64,
    pub grants: Vec<GrantResponse>,
}

/// Build the access router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/evidence/:id/requests",
            post(request_access).get(list_pending),
        )
        .route("/v1/evidence/:id/requests/:user/deny", post(deny_access))
        .route("/v1/evidence/:id/grants", post(grant_access).get(list_grants))
        .route("/v1/evidence/:id/grants/:user", delete(revoke_access))
        .route("/v1/evidence/:id/permissions/:user", get(get_permission))
}

/// POST /v1/evidence/:id/requests — Caller requests access.
#[utoipa::path(
    post,
    path = "/v1/evidence/{id}/requests",
    params(("id" = u64, Path, description = "Evidence id")),
    responses(
        (status = 201, description = "Request recorded", body = PermissionResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Self-request, already pending or already granted", body = crate::error::ErrorBody),
    ),
    tag = "access"
)]
pub(crate) async fn request_access(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<PermissionResponse>), AppError> {
    let id = parse_evidence_id(&id)?;
    let requester = caller.identity();
    state.registry.write().request_access(id, requester)?;
    let response =
        PermissionResponse::new(id, requester, false).with_state(PermissionState::Pending);
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /v1/evidence/:id/requests — Owner lists pending requesters.
#[utoipa::path(
    get,
    path = "/v1/evidence/{id}/requests",
    params(("id" = u64, Path, description = "Evidence id")),
    responses(
        (status = 200, description = "Pending requesters", body = IdentityListResponse),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "access"
)]
pub(crate) async fn list_pending(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<IdentityListResponse>, AppError> {
    let id = parse_evidence_id(&id)?;
    let users = state.registry.read().list_pending(id, caller.identity())?;
    Ok(Json(IdentityListResponse {
        evidence_id: id.get(),
        users: users.iter().map(Identity::to_string).collect(),
    }))
}

/// POST /v1/evidence/:id/requests/:user/deny — Owner rejects a pending request.
#[utoipa::path(
    post,
    path = "/v1/evidence/{id}/requests/{user}/deny",
    params(
        ("id" = u64, Path, description = "Evidence id"),
        ("user" = String, Path, description = "Requesting identity"),
    ),
    responses(
        (status = 200, description = "Request denied", body = PermissionResponse),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "No pending request", body = crate::error::ErrorBody),
    ),
    tag = "access"
)]
pub(crate) async fn deny_access(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, user)): Path<(String, String)>,
) -> Result<Json<PermissionResponse>, AppError> {
    let id = parse_evidence_id(&id)?;
    let user = parse_identity(&user)?;
    state
        .registry
        .write()
        .deny_access(id, caller.identity(), &user)?;
    Ok(Json(
        PermissionResponse::new(id, &user, false).with_state(PermissionState::None),
    ))
}

/// POST /v1/evidence/:id/grants — Owner grants a pending request.
#[utoipa::path(
    post,
    path = "/v1/evidence/{id}/grants",
    params(("id" = u64, Path, description = "Evidence id")),
    request_body = GrantAccessRequest,
    responses(
        (status = 201, description = "Access granted", body = GrantResponse),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "No pending request", body = crate::error::ErrorBody),
    ),
    tag = "access"
)]
pub(crate) async fn grant_access(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<GrantAccessRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GrantResponse>), AppError> {
    let id = parse_evidence_id(&id)?;
    let req = extract_validated_json(body)?;
    let user = parse_identity(&req.user)?;
    let entry = state
        .registry
        .write()
        .grant_access(id, caller.identity(), &user)?;
    Ok((StatusCode::CREATED, Json(GrantResponse::new(id, &entry))))
}

/// GET /v1/evidence/:id/grants — Owner lists current grants.
#[utoipa::path(
    get,
    path = "/v1/evidence/{id}/grants",
    params(("id" = u64, Path, description = "Evidence id")),
    responses(
        (status = 200, description = "Current grants", body = GrantListResponse),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "access"
)]
pub(crate) async fn list_grants(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<GrantListResponse>, AppError> {
    let id = parse_evidence_id(&id)?;
    let grants = state.registry.read().list_grants(id, caller.identity())?;
    Ok(Json(GrantListResponse {
        evidence_id: id.get(),
        grants: grants.iter().map(|g| GrantResponse::new(id, g)).collect(),
    }))
}

/// DELETE /v1/evidence/:id/grants/:user — Owner revokes a grant.
#[utoipa::path(
    delete,
    path = "/v1/evidence/{id}/grants/{user}",
    params(
        ("id" = u64, Path, description = "Evidence id"),
        ("user" = String, Path, description = "Granted identity"),
    ),
    responses(
        (status = 200, description = "Grant revoked", body = PermissionResponse),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "User holds no grant", body = crate::error::ErrorBody),
    ),
    tag = "access"
)]
pub(crate) async fn revoke_access(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, user)): Path<(String, String)>,
) -> Result<Json<PermissionResponse>, AppError> {
    let id = parse_evidence_id(&id)?;
    let user = parse_identity(&user)?;
    state
        .registry
        .write()
        .revoke_access(id, caller.identity(), &user)?;
    Ok(Json(
        PermissionResponse::new(id, &user, false).with_state(PermissionState::None),
    ))
}

/// GET /v1/evidence/:id/permissions/:user — Whether `user` may read the record.
///
/// Open to anonymous callers; `state` is only filled in for the owner or
/// `user` themselves.
#[utoipa::path(
    get,
    path = "/v1/evidence/{id}/permissions/{user}",
    params(
        ("id" = u64, Path, description = "Evidence id"),
        ("user" = String, Path, description = "Identity to check"),
    ),
    responses(
        (status = 200, description = "Permission", body = PermissionResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "access"
)]
pub(crate) async fn get_permission(
    State(state): State<AppState>,
    caller: Option<CallerIdentity>,
    Path((id, user)): Path<(String, String)>,
) -> Result<Json<PermissionResponse>, AppError> {
    let id = parse_evidence_id(&id)?;
    let user = parse_identity(&user)?;

    let registry = state.registry.read();
    let has_permission = registry.has_permission(id, &user)?;
    let response = PermissionResponse::new(id, &user, has_permission);
    let Some(caller) = caller else {
        return Ok(Json(response));
    };
    let response = match registry.permission_state(id, caller.identity(), &user) {
        Ok(permission) => response.with_state(permission),
        Err(RegistryError::Unauthorized { .. }) => response,
        Err(other) => return Err(other.into()),
    };
    Ok(Json(response))
}
