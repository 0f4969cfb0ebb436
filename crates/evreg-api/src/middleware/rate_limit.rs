//! # Per-Caller Rate Limiting
//!
//! Fixed-window request budget keyed by the authenticated caller. Requests
//! without a caller identity share the `anonymous` bucket.
//!
//! Buckets whose window has elapsed carry no state worth keeping. Once the
//! map reaches its sweep threshold, a new caller triggers a sweep of expired
//! buckets; if live buckets still fill it, the threshold doubles so sweeps
//! stay amortized.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::auth::CallerIdentity;
use crate::error::{ErrorBody, ErrorDetail};

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window_secs: 60,
        }
    }
}

/// Bucket count at which the first sweep runs.
const INITIAL_SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

#[derive(Debug)]
struct Buckets {
    map: HashMap<String, BucketState>,
    sweep_at: usize,
}

impl Buckets {
    fn sweep(&mut self, now: Instant, window_secs: u64) {
        self.map
            .retain(|_, b| now.duration_since(b.window_start).as_secs() < window_secs);
        self.sweep_at = INITIAL_SWEEP_THRESHOLD.max(self.map.len().saturating_mul(2));
    }
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<Buckets>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(Buckets {
                map: HashMap::new(),
                sweep_at: INITIAL_SWEEP_THRESHOLD,
            })),
        }
    }

    /// Whether a request from `key` fits in the current window. Counts it if so.
    fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();

        if buckets.map.len() >= buckets.sweep_at && !buckets.map.contains_key(key) {
            buckets.sweep(now, self.config.window_secs);
        }

        let bucket = buckets.map.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });

        if now.duration_since(bucket.window_start).as_secs() >= self.config.window_secs {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }
}

/// Middleware that enforces per-caller rate limits. Runs after
/// authentication so the caller identity is known.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = request
            .extensions()
            .get::<CallerIdentity>()
            .map(|c| c.identity().to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        if !limiter.check(&key) {
            tracing::warn!(caller = %key, "rate limit exceeded");
            let body = ErrorBody {
                error: ErrorDetail {
                    code: "RATE_LIMITED".to_string(),
                    message: "rate limit exceeded".to_string(),
                    details: None,
                },
            };
            return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
impl RateLimiter {
    fn bucket_count(&self) -> usize {
        self.buckets.lock().map.len()
    }
}
