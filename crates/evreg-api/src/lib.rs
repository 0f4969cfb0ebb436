//! # evreg-api — HTTP Service for the Evidence Registry
//!
//! ## API Surface
//!
//! | Method & path                                | Handler                          |
//! |----------------------------------------------|----------------------------------|
//! | `POST /v1/evidence`                          | [`routes::evidence`] submit      |
//! | `GET /v1/evidence/:id`                       | [`routes::evidence`] view        |
//! | `PUT /v1/evidence/:id/active`                | [`routes::evidence`] set active  |
//! | `POST, GET /v1/evidence/:id/requests`        | [`routes::access`] request, list |
//! | `POST /v1/evidence/:id/requests/:user/deny`  | [`routes::access`] deny          |
//! | `POST, GET /v1/evidence/:id/grants`          | [`routes::access`] grant, list   |
//! | `DELETE /v1/evidence/:id/grants/:user`       | [`routes::access`] revoke        |
//! | `GET /v1/evidence/:id/permissions/:user`     | [`routes::access`] permission    |
//! | `GET /v1/evidence/:id/audit`                 | [`routes::audit`]                |
//! | `GET /v1/owners/:owner/evidence`             | [`routes::owners`]               |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated with utoipa at `/openapi.json`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimiter;
use crate::state::AppState;

/// Assemble the full application router.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    app_with_metrics(state, ApiMetrics::new())
}

/// [`app`] with caller-supplied metrics counters.
pub fn app_with_metrics(state: AppState, metrics: ApiMetrics) -> Router {
    let auth_config = AuthConfig {
        secret: state.config.auth_secret.clone(),
    };
    let limiter = RateLimiter::new(state.config.rate_limit.clone());

    let api = Router::new()
        .merge(routes::evidence::router())
        .merge(routes::access::router())
        .merge(routes::audit::router())
        .merge(routes::owners::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
