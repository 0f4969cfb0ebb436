//! # Evidence Records
//!
//! Submit a record, read it through the redacting view, and toggle its
//! `active` flag.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use evreg_state::{EvidenceView, Submission};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_evidence_id, Validate};
use crate::state::AppState;

/// Upper bound on any single submitted text field, in bytes.
const MAX_FIELD_LEN: usize = 64 * 1024;

/// Request to submit a new evidence record. The caller becomes its owner.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitEvidenceRequest {
    /// Opaque reference to the stored content, e.g. a CID.
    pub content_ref: String,
    /// Opaque decryption material. Only the owner and granted users see it.
    pub key_blob: String,
    #[serde(default)]
    pub description: String,
}

impl Validate for SubmitEvidenceRequest {
    fn validate(&self) -> Result<(), String> {
        if self.content_ref.trim().is_empty() {
            return Err("content_ref must not be empty".to_string());
        }
        for (name, value) in [
            ("content_ref", &self.content_ref),
            ("key_blob", &self.key_blob),
            ("description", &self.description),
        ] {
            if value.len() > MAX_FIELD_LEN {
                return Err(format!("{name} exceeds {MAX_FIELD_LEN} bytes"));
            }
        }
        Ok(())
    }
}

/// Request to mark a record current or non-current.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

impl Validate for SetActiveRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A record as seen by the caller. `content_ref` and `key_blob` are empty
/// unless `has_access`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EvidenceResponse {
    pub id: u64,
    pub owner: String,
    pub content_ref: String,
    pub key_blob: String,
    pub description: String,
    pub created_at: String,
    pub active: bool,
    pub has_access: bool,
    pub has_requested: bool,
}

impl From<EvidenceView> for EvidenceResponse {
    fn from(view: EvidenceView) -> Self {
        Self {
            id: view.id.get(),
            owner: view.owner.to_string(),
            content_ref: view.content_ref,
            key_blob: view.key_blob,
            description: view.description,
            created_at: view.created_at.to_canonical_string(),
            active: view.active,
            has_access: view.has_access,
            has_requested: view.has_requested,
        }
    }
}

/// Build the evidence router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/evidence", post(submit_evidence))
        .route("/v1/evidence/:id", get(get_evidence))
        .route("/v1/evidence/:id/active", put(set_active))
}

/// POST /v1/evidence — Submit a new record.
#[utoipa::path(
    post,
    path = "/v1/evidence",
    request_body = SubmitEvidenceRequest,
    responses(
        (status = 201, description = "Evidence created", body = EvidenceResponse),
        (status = 401, description = "No caller identity", body = crate::error::ErrorBody),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "evidence"
)]
pub(crate) async fn submit_evidence(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<SubmitEvidenceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EvidenceResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let owner = caller.identity();

    let mut registry = state.registry.write();
    let id = registry.submit(
        owner,
        Submission {
            content_ref: req.content_ref,
            key_blob: req.key_blob,
            description: req.description,
        },
    )?;
    let view = registry.view(id, owner)?;

    Ok((StatusCode::CREATED, Json(view.into())))
}

/// GET /v1/evidence/:id — Redacted view of a record.
#[utoipa::path(
    get,
    path = "/v1/evidence/{id}",
    params(("id" = u64, Path, description = "Evidence id")),
    responses(
        (status = 200, description = "Evidence view", body = EvidenceResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "evidence"
)]
pub(crate) async fn get_evidence(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<EvidenceResponse>, AppError> {
    let id = parse_evidence_id(&id)?;
    let view = state.registry.read().view(id, caller.identity())?;
    Ok(Json(view.into()))
}

/// PUT /v1/evidence/:id/active — Owner sets the `active` flag.
#[utoipa::path(
    put,
    path = "/v1/evidence/{id}/active",
    params(("id" = u64, Path, description = "Evidence id")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Flag updated", body = EvidenceResponse),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "evidence"
)]
pub(crate) async fn set_active(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<SetActiveRequest>, JsonRejection>,
) -> Result<Json<EvidenceResponse>, AppError> {
    let id = parse_evidence_id(&id)?;
    let req = extract_validated_json(body)?;

    let mut registry = state.registry.write();
    registry.set_active(id, caller.identity(), req.active)?;
    let view = registry.view(id, caller.identity())?;
    Ok(Json(view.into()))
}
