//! # Registry Events
//!
//! One [`RegistryEvent`] is emitted per accepted transition. Events are a
//! notification side channel: observers (audit trail, logs, UI refresh)
//! receive them through the [`EventSink`] trait and cannot write back into
//! the registry. Sinks have no error channel, so delivery can never fail the
//! operation that produced the event.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use evreg_core::{EvidenceId, Identity, Timestamp};

/// An accepted registry transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A new evidence record was created.
    Submitted {
        /// The affected record.
        evidence_id: EvidenceId,
        /// The record owner, acting.
        owner: Identity,
        /// Content reference of the new record.
        content_ref: String,
    },
    /// A non-owner requested access.
    Requested {
        /// The affected record.
        evidence_id: EvidenceId,
        /// The identity asking for access.
        requester: Identity,
    },
    /// The owner granted a pending request.
    Granted {
        /// The affected record.
        evidence_id: EvidenceId,
        /// The record owner, acting.
        owner: Identity,
        /// The identity whose access changed.
        user: Identity,
        /// When the grant took effect.
        granted_at: Timestamp,
    },
    /// The owner denied a pending request.
    Denied {
        /// The affected record.
        evidence_id: EvidenceId,
        /// The record owner, acting.
        owner: Identity,
        /// The identity whose access changed.
        user: Identity,
    },
    /// The owner revoked a grant.
    Revoked {
        /// The affected record.
        evidence_id: EvidenceId,
        /// The record owner, acting.
        owner: Identity,
        /// The identity whose access changed.
        user: Identity,
    },
    /// The owner toggled the record's `active` flag.
    ActiveChanged {
        /// The affected record.
        evidence_id: EvidenceId,
        /// The record owner, acting.
        owner: Identity,
        /// The new value of the flag.
        active: bool,
    },
}

impl RegistryEvent {
    /// The record this event concerns.
    pub fn evidence_id(&self) -> EvidenceId {
        match self {
            Self::Submitted { evidence_id, .. }
            | Self::Requested { evidence_id, .. }
            | Self::Granted { evidence_id, .. }
            | Self::Denied { evidence_id, .. }
            | Self::Revoked { evidence_id, .. }
            | Self::ActiveChanged { evidence_id, .. } => *evidence_id,
        }
    }

    /// The identity whose call produced the event.
    pub fn actor(&self) -> &Identity {
        match self {
            Self::Requested { requester, .. } => requester,
            Self::Submitted { owner, .. }
            | Self::Granted { owner, .. }
            | Self::Denied { owner, .. }
            | Self::Revoked { owner, .. }
            | Self::ActiveChanged { owner, .. } => owner,
        }
    }

    /// The user a permission transition applied to, if any.
    pub fn subject(&self) -> Option<&Identity> {
        match self {
            Self::Requested { requester, .. } => Some(requester),
            Self::Granted { user, .. } | Self::Denied { user, .. } | Self::Revoked { user, .. } => {
                Some(user)
            }
            Self::Submitted { .. } | Self::ActiveChanged { .. } => None,
        }
    }

    /// Stable machine-readable event name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "submitted",
            Self::Requested { .. } => "requested",
            Self::Granted { .. } => "granted",
            Self::Denied { .. } => "denied",
            Self::Revoked { .. } => "revoked",
            Self::ActiveChanged { .. } => "active_changed",
        }
    }

    /// Deterministic `|`-separated rendering of every field, used as the
    /// audit hash preimage.
    pub fn canonical_fields(&self) -> String {
        let head = format!("{}|{}|{}", self.kind(), self.evidence_id(), self.actor());
        match self {
            Self::Submitted { content_ref, .. } => format!("{head}|{content_ref}"),
            Self::Requested { .. } => head,
            Self::Granted {
                user, granted_at, ..
            } => format!("{head}|{user}|{granted_at}"),
            Self::Denied { user, .. } | Self::Revoked { user, .. } => format!("{head}|{user}"),
            Self::ActiveChanged { active, .. } => format!("{head}|{active}"),
        }
    }
}

// ─── Sinks ───────────────────────────────────────────────────────────

/// Observer of registry events.
///
/// Called synchronously inside the registry's serialized write section,
/// after the transition has been applied. Implementations must not block.
pub trait EventSink: Send + Sync {
    /// Receive one event.
    fn emit(&self, event: &RegistryEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &RegistryEvent) {}
}

/// Logs every event through `tracing` at info level.
///
/// The content reference of a submission is not logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RegistryEvent) {
        tracing::info!(
            event = event.kind(),
            evidence_id = %event.evidence_id(),
            actor = %event.actor(),
            subject = event.subject().map(Identity::as_str),
            "registry event"
        );
    }
}

/// Captures events in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<RegistryEvent>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event received so far.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().clone()
    }

    /// Number of events received so far.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no event has been received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &RegistryEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Forwards each event to several sinks in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Create a fan-out with no targets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target.
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no targets.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &RegistryEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
