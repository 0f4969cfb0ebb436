//! # Evidence Views
//!
//! Caller-specific projection of an evidence record. The full record always
//! exists in the store; a view replaces `content_ref` and `key_blob` with
//! empty strings unless the caller is the owner or holds a grant. This is the
//! only path by which sensitive fields leave the registry.

use serde::{Deserialize, Serialize};

use evreg_core::{EvidenceId, Identity, Timestamp};

use crate::evidence::EvidenceRecord;
use crate::permission::PermissionState;

/// A record as seen by one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceView {
    /// Record id.
    pub id: EvidenceId,
    /// The submitting identity.
    pub owner: Identity,
    /// Empty unless `has_access`.
    pub content_ref: String,
    /// Empty unless `has_access`.
    pub key_blob: String,
    /// Free-text description, never redacted.
    pub description: String,
    /// Submission time.
    pub created_at: Timestamp,
    /// Whether the record is marked current.
    pub active: bool,
    /// The caller is the owner or holds a grant.
    pub has_access: bool,
    /// The caller has a pending request.
    pub has_requested: bool,
}

impl EvidenceView {
    /// Project `record` for `caller`, whose permission state is `state`.
    pub fn project(record: &EvidenceRecord, caller: &Identity, state: PermissionState) -> Self {
        let has_access = record.is_owner(caller) || state == PermissionState::Granted;
        let (content_ref, key_blob) = if has_access {
            (record.content_ref().to_string(), record.key_blob().to_string())
        } else {
            (String::new(), String::new())
        };
        Self {
            id: record.id(),
            owner: record.owner().clone(),
            content_ref,
            key_blob,
            description: record.description().to_string(),
            created_at: record.created_at(),
            active: record.is_active(),
            has_access,
            has_requested: state == PermissionState::Pending,
        }
    }

    /// Whether sensitive fields were withheld.
    pub fn is_redacted(&self) -> bool {
        !self.has_access
    }
}
