//! # Request Tracing
//!
//! `tower_http::trace::TraceLayer` giving each request a span with method,
//! URI, and status.

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;

/// Build the request tracing layer.
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}
