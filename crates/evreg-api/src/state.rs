//! # Application State
//!
//! Shared state for the Axum application, passed to route handlers via the
//! `State` extractor.
//!
//! The registry sits behind a single `parking_lot::RwLock`. Mutating
//! handlers hold the write lock for the whole transition (checks, update,
//! event delivery), which serializes conflicting requests into one total
//! order. Readers take the read lock and always see committed state. The
//! lock is never held across an `.await`.

use std::sync::Arc;

use parking_lot::RwLock;

use evreg_state::{AuditLog, EvidenceRegistry, FanoutSink, TracingSink};

use crate::middleware::rate_limit::RateLimitConfig;

/// Application configuration.
///
/// Custom `Debug` redacts the auth secret.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared secret for bearer tokens. `None` enables development mode,
    /// where the caller identity comes from the `X-Caller-Identity` header.
    pub auth_secret: Option<String>,
    /// Per-caller request budget.
    pub rate_limit: RateLimitConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_secret",
                &self.auth_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_secret: None,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build configuration from `PORT`, `AUTH_SECRET`,
    /// `RATE_LIMIT_MAX_REQUESTS` and `RATE_LIMIT_WINDOW_SECS`. Unset or
    /// unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            auth_secret: lookup("AUTH_SECRET").filter(|s| !s.is_empty()),
            rate_limit: RateLimitConfig {
                max_requests: parsed("RATE_LIMIT_MAX_REQUESTS")
                    .unwrap_or(defaults.rate_limit.max_requests),
                window_secs: parsed("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or(defaults.rate_limit.window_secs),
            },
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The registry. Every accepted transition is logged and appended to
    /// [`Self::audit`].
    pub registry: Arc<RwLock<EvidenceRegistry>>,
    /// Hash-chained history of every accepted transition.
    pub audit: Arc<AuditLog>,
    pub config: AppConfig,
}

impl AppState {
    /// State with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// State with the given configuration and an empty registry.
    pub fn with_config(config: AppConfig) -> Self {
        let audit = Arc::new(AuditLog::new());
        let sink = FanoutSink::new()
            .with(Arc::new(TracingSink))
            .with(audit.clone());
        Self {
            registry: Arc::new(RwLock::new(EvidenceRegistry::with_sink(Arc::new(sink)))),
            audit,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
