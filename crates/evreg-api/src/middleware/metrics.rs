//! # Request Metrics
//!
//! In-process request, client-error, and server-error counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Shared metrics state. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    request_count: Arc<AtomicU64>,
    client_error_count: Arc<AtomicU64>,
    server_error_count: Arc<AtomicU64>,
}

impl ApiMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests observed.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Responses with a 4xx status. Rejected registry transitions land here.
    pub fn client_errors(&self) -> u64 {
        self.client_error_count.load(Ordering::Relaxed)
    }

    /// Responses with a 5xx status.
    pub fn server_errors(&self) -> u64 {
        self.server_error_count.load(Ordering::Relaxed)
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.request_count.fetch_add(1, Ordering::Relaxed);
        let status = response.status();
        if status.is_client_error() {
            m.client_error_count.fetch_add(1, Ordering::Relaxed);
        } else if status.is_server_error() {
            m.server_error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    response
}
