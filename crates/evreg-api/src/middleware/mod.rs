//! # Middleware
//!
//! Request metrics, per-caller rate limiting, and request tracing.

pub mod metrics;
pub mod rate_limit;
pub mod tracing_layer;
