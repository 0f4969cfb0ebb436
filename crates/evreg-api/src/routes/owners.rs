//! # Evidence by Owner

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::parse_identity;
use crate::state::AppState;

/// Ids owned by one identity, in submission order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OwnerEvidenceResponse {
    pub owner: String,
    pub evidence_ids: Vec<u64>,
}

/// Build the owners router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/owners/:owner/evidence", get(list_by_owner))
}

/// GET /v1/owners/:owner/evidence — Ids owned by `owner`.
#[utoipa::path(
    get,
    path = "/v1/owners/{owner}/evidence",
    params(("owner" = String, Path, description = "Owner identity")),
    responses(
        (status = 200, description = "Owned evidence ids", body = OwnerEvidenceResponse),
        (status = 422, description = "Malformed identity", body = crate::error::ErrorBody),
    ),
    tag = "evidence"
)]
pub(crate) async fn list_by_owner(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<OwnerEvidenceResponse>, AppError> {
    let owner = parse_identity(&owner)?;
    let ids = state.registry.read().list_by_owner(&owner);
    Ok(Json(OwnerEvidenceResponse {
        owner: owner.to_string(),
        evidence_ids: ids.iter().map(|id| id.get()).collect(),
    }))
}
