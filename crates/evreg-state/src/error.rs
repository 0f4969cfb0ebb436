//! # Registry Errors
//!
//! The three-way failure taxonomy of the registry (`NotFound`,
//! `Unauthorized`, `InvalidState`) plus allocator exhaustion. Every error is
//! returned before any mutation happens, so a failed call leaves the
//! registry exactly as it was and emits no event.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use evreg_core::{EvidenceId, Identity};

/// Operations reserved for the owner of an evidence record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerOperation {
    /// Move a pending requester to granted.
    Grant,
    /// Reject a pending request.
    Deny,
    /// Withdraw a previous grant.
    Revoke,
    /// Toggle the `active` flag.
    SetActive,
    /// Enumerate pending requesters.
    ListPending,
    /// Enumerate granted users.
    ListGranted,
    /// Read another user's permission state.
    ReadPermissionState,
    /// Read the record's audit history.
    ReadAudit,
}

impl OwnerOperation {
    /// Return the string representation of this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Deny => "deny",
            Self::Revoke => "revoke",
            Self::SetActive => "set-active",
            Self::ListPending => "list-pending",
            Self::ListGranted => "list-granted",
            Self::ReadPermissionState => "read-permission-state",
            Self::ReadAudit => "read-audit",
        }
    }
}

impl std::fmt::Display for OwnerOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a permission transition was not legal from the user's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidStateReason {
    /// The owner tried to request access to their own record.
    SelfRequest,
    /// The requester already has a pending request.
    AlreadyPending,
    /// The requester already holds a grant.
    AlreadyGranted,
    /// Grant or deny targeted a user with no pending request.
    NotPending,
    /// Revoke targeted a user without a grant.
    NotGranted,
}

impl InvalidStateReason {
    /// Return the string representation of this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfRequest => "self-request",
            Self::AlreadyPending => "already-pending",
            Self::AlreadyGranted => "already-granted",
            Self::NotPending => "not-pending",
            Self::NotGranted => "not-granted",
        }
    }
}

impl std::fmt::Display for InvalidStateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No evidence record carries this id.
    #[error("evidence {0} not found")]
    NotFound(EvidenceId),

    /// A non-owner attempted an owner-only operation.
    #[error("{caller} is not the owner of evidence {evidence_id} ({operation} is owner-only)")]
    Unauthorized {
        /// The record the operation targeted.
        evidence_id: EvidenceId,
        /// The identity that attempted the operation.
        caller: Identity,
        /// The owner-only operation that was attempted.
        operation: OwnerOperation,
    },

    /// The transition is not legal from the user's current permission state.
    #[error("invalid state for {user} on evidence {evidence_id}: {reason}")]
    InvalidState {
        /// The record the operation targeted.
        evidence_id: EvidenceId,
        /// The user whose permission state blocked the transition.
        user: Identity,
        /// Which precondition failed.
        reason: InvalidStateReason,
    },

    /// The allocator has issued every representable id.
    #[error("evidence id space exhausted")]
    IdSpaceExhausted,
}

impl RegistryError {
    /// The invalid-state reason, if this is an `InvalidState` error.
    pub fn invalid_state_reason(&self) -> Option<InvalidStateReason> {
        match self {
            Self::InvalidState { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
