//! # OpenAPI Specification
//!
//! Serves the generated OpenAPI document at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the registry API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Evidence Registry API",
        version = "0.1.0",
        description = "Owner-controlled access to evidence records: submission, access requests, grants, redacted views, and a hash-chained audit trail.",
        license(name = "BUSL-1.1")
    ),
    paths(
        crate::routes::evidence::submit_evidence,
        crate::routes::evidence::get_evidence,
        crate::routes::evidence::set_active,
        crate::routes::access::request_access,
        crate::routes::access::list_pending,
        crate::routes::access::deny_access,
        crate::routes::access::grant_access,
        crate::routes::access::list_grants,
        crate::routes::access::revoke_access,
        crate::routes::access::get_permission,
        crate::routes::audit::get_audit_trail,
        crate::routes::owners::list_by_owner,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::evidence::SubmitEvidenceRequest,
        crate::routes::evidence::SetActiveRequest,
        crate::routes::evidence::EvidenceResponse,
        crate::routes::access::GrantAccessRequest,
        crate::routes::access::PermissionResponse,
        crate::routes::access::IdentityListResponse,
        crate::routes::access::GrantResponse,
        crate::routes::access::GrantListResponse,
        crate::routes::audit::AuditEntryResponse,
        crate::routes::audit::AuditTrailResponse,
        crate::routes::owners::OwnerEvidenceResponse,
    )),
    tags(
        (name = "evidence", description = "Evidence submission and redacted views"),
        (name = "access", description = "Access requests and owner decisions"),
        (name = "audit", description = "Hash-chained audit trail"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
