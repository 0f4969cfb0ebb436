//! # Audit Trail
//!
//! The hash-chained history of a record: every accepted transition,
//! including requests that were later denied and grants later revoked.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use evreg_state::{AuditEntry, OwnerOperation};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::parse_evidence_id;
use crate::state::AppState;

/// One audit entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryResponse {
    pub sequence: u64,
    /// Event kind, e.g. `granted`.
    pub kind: String,
    /// The event, tagged by `type`.
    #[schema(value_type = Object)]
    pub event: serde_json::Value,
    pub recorded_at: String,
    pub previous_hash: String,
    pub entry_hash: String,
}

impl TryFrom<&AuditEntry> for AuditEntryResponse {
    type Error = AppError;

    fn try_from(entry: &AuditEntry) -> Result<Self, Self::Error> {
        let event = serde_json::to_value(&entry.event)
            .map_err(|e| AppError::Internal(format!("audit event serialization: {e}")))?;
        Ok(Self {
            sequence: entry.sequence,
            kind: entry.event.kind().to_string(),
            event,
            recorded_at: entry.recorded_at.to_canonical_string(),
            previous_hash: entry.previous_hash.clone(),
            entry_hash: entry.entry_hash.clone(),
        })
    }
}

/// Audit history of one record.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditTrailResponse {
    pub evidence_id: u64,
    /// Whether the whole chain (all records) verifies.
    pub chain_valid: bool,
    pub entries: Vec<AuditEntryResponse>,
}

/// Build the audit router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/evidence/:id/audit", get(get_audit_trail))
}

/// GET /v1/evidence/:id/audit — Owner reads the record's history.
#[utoipa::path(
    get,
    path = "/v1/evidence/{id}/audit",
    params(("id" = u64, Path, description = "Evidence id")),
    responses(
        (status = 200, description = "Audit trail", body = AuditTrailResponse),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "audit"
)]
pub(crate) async fn get_audit_trail(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<AuditTrailResponse>, AppError> {
    let id = parse_evidence_id(&id)?;

    // Ownership check and entry read see the same registry state.
    let registry = state.registry.read();
    registry.require_owner(id, caller.identity(), OwnerOperation::ReadAudit)?;
    let entries = state.audit.entries_for(id);
    drop(registry);

    let chain_valid = match state.audit.verify_chain() {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "audit chain verification failed");
            false
        }
    };

    Ok(Json(AuditTrailResponse {
        evidence_id: id.get(),
        chain_valid,
        entries: entries
            .iter()
            .map(AuditEntryResponse::try_from)
            .collect::<Result<Vec<_>, AppError>>()?,
    }))
}
