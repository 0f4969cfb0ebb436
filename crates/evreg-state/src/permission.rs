//! # Permission Ledger
//!
//! Per-`(evidence, user)` access state and the request/grant/deny/revoke
//! state machine.
//!
//! ## States
//!
//! ```text
//!            request()             grant()
//!   NONE ───────────────▶ PENDING ─────────▶ GRANTED
//!    ▲                       │                  │
//!    │        deny()         │                  │
//!    ├───────────────────────┘                  │
//!    │                     revoke()             │
//!    └──────────────────────────────────────────┘
//! ```
//!
//! ## Source of truth
//!
//! The tri-state value in [`AccessList::states`] is authoritative. The
//! `pending` and `granted` sets are secondary indexes, updated in the same
//! step as the state value and never on their own. Every transition checks
//! all of its preconditions before touching anything, so a rejected call
//! leaves the list unchanged.
//!
//! The owner is never a key here: ownership is checked against the record,
//! and the owner's own request is rejected as `self-request`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use evreg_core::{EvidenceId, Identity, Timestamp};

use crate::error::{InvalidStateReason, OwnerOperation, RegistryError};
use crate::evidence::EvidenceRecord;
use crate::indexed_set::IndexedSet;

// ─── Permission State ────────────────────────────────────────────────

/// Access state of a non-owner user for one evidence record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionState {
    /// No request outstanding and no grant held.
    #[default]
    None,
    /// A request awaits the owner's decision.
    Pending,
    /// The owner has granted access.
    Granted,
}

impl PermissionState {
    /// Return the string representation of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Pending => "PENDING",
            Self::Granted => "GRANTED",
        }
    }
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A granted user together with the time of the grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantEntry {
    /// The grantee.
    pub user: Identity,
    /// When the grant was made.
    pub granted_at: Timestamp,
}

// ─── Access List ─────────────────────────────────────────────────────

/// Permission table for a single evidence record.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    /// Authoritative state per user. Rows are created on first request and
    /// never removed; they cycle back to `None`.
    states: HashMap<Identity, PermissionState>,
    pending: IndexedSet<Identity>,
    granted: IndexedSet<Identity>,
    granted_at: HashMap<Identity, Timestamp>,
}

impl AccessList {
    /// Current state of `user`. Unknown users are `None`.
    pub fn state(&self, user: &Identity) -> PermissionState {
        self.states.get(user).copied().unwrap_or_default()
    }

    /// Users currently pending.
    pub fn pending(&self) -> &[Identity] {
        self.pending.as_slice()
    }

    /// Users currently granted.
    pub fn granted(&self) -> &[Identity] {
        self.granted.as_slice()
    }

    /// Grant time of `user`, if currently granted.
    pub fn granted_at(&self, user: &Identity) -> Option<Timestamp> {
        self.granted_at.get(user).copied()
    }

    /// Granted users with their grant times, in enumeration order.
    pub fn grants(&self) -> Vec<GrantEntry> {
        self.granted
            .iter()
            .filter_map(|user| {
                self.granted_at.get(user).map(|at| GrantEntry {
                    user: user.clone(),
                    granted_at: *at,
                })
            })
            .collect()
    }

    /// Number of users that have ever requested access.
    pub fn known_users(&self) -> usize {
        self.states.len()
    }

    fn set_state(&mut self, user: &Identity, state: PermissionState) {
        match self.states.get_mut(user) {
            Some(slot) => *slot = state,
            None => {
                self.states.insert(user.clone(), state);
            }
        }
    }

    // NONE → PENDING
    fn request(&mut self, user: &Identity) -> Result<(), InvalidStateReason> {
        match self.state(user) {
            PermissionState::Pending => return Err(InvalidStateReason::AlreadyPending),
            PermissionState::Granted => return Err(InvalidStateReason::AlreadyGranted),
            PermissionState::None => {}
        }
        self.set_state(user, PermissionState::Pending);
        self.pending.insert(user.clone());
        Ok(())
    }

    // PENDING → GRANTED
    fn grant(&mut self, user: &Identity, now: Timestamp) -> Result<(), InvalidStateReason> {
        if self.state(user) != PermissionState::Pending {
            return Err(InvalidStateReason::NotPending);
        }
        self.set_state(user, PermissionState::Granted);
        self.pending.remove(user);
        self.granted.insert(user.clone());
        self.granted_at.insert(user.clone(), now);
        Ok(())
    }

    // PENDING → NONE
    fn deny(&mut self, user: &Identity) -> Result<(), InvalidStateReason> {
        if self.state(user) != PermissionState::Pending {
            return Err(InvalidStateReason::NotPending);
        }
        self.set_state(user, PermissionState::None);
        self.pending.remove(user);
        Ok(())
    }

    // GRANTED → NONE
    fn revoke(&mut self, user: &Identity) -> Result<(), InvalidStateReason> {
        if self.state(user) != PermissionState::Granted {
            return Err(InvalidStateReason::NotGranted);
        }
        self.set_state(user, PermissionState::None);
        self.granted.remove(user);
        self.granted_at.remove(user);
        Ok(())
    }
}

// ─── Ledger ──────────────────────────────────────────────────────────

/// Access lists for every evidence record.
///
/// Owner-only operations take the [`EvidenceRecord`] so ownership is decided
/// by the registry store, not by anything recorded here.
#[derive(Debug, Default)]
pub struct PermissionLedger {
    lists: HashMap<EvidenceId, AccessList>,
}

impl PermissionLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// The access list of a record. Records nobody has requested yet have an
    /// empty list.
    pub fn access_list(&self, id: EvidenceId) -> Option<&AccessList> {
        self.lists.get(&id)
    }

    /// State of `user` for `record`. The owner reports `None`; ownership is
    /// separate from the permission table.
    pub fn state(&self, record: &EvidenceRecord, user: &Identity) -> PermissionState {
        self.lists
            .get(&record.id())
            .map(|list| list.state(user))
            .unwrap_or_default()
    }

    /// Whether `user` may read the sensitive fields of `record`.
    pub fn has_permission(&self, record: &EvidenceRecord, user: &Identity) -> bool {
        record.is_owner(user) || self.state(record, user) == PermissionState::Granted
    }

    /// Pending requesters of `record`.
    pub fn pending(&self, record: &EvidenceRecord) -> &[Identity] {
        self.lists
            .get(&record.id())
            .map(AccessList::pending)
            .unwrap_or(&[])
    }

    /// Granted users of `record`.
    pub fn granted(&self, record: &EvidenceRecord) -> &[Identity] {
        self.lists
            .get(&record.id())
            .map(AccessList::granted)
            .unwrap_or(&[])
    }

    /// Granted users of `record` with their grant times.
    pub fn grants(&self, record: &EvidenceRecord) -> Vec<GrantEntry> {
        self.lists
            .get(&record.id())
            .map(AccessList::grants)
            .unwrap_or_default()
    }

    /// `requester` asks for access to `record`.
    ///
    /// # Errors
    ///
    /// `InvalidState` with `self-request`, `already-pending`, or
    /// `already-granted`.
    pub fn request(
        &mut self,
        record: &EvidenceRecord,
        requester: &Identity,
    ) -> Result<(), RegistryError> {
        if record.is_owner(requester) {
            return Err(invalid(record, requester, InvalidStateReason::SelfRequest));
        }
        self.lists
            .entry(record.id())
            .or_default()
            .request(requester)
            .map_err(|reason| invalid(record, requester, reason))
    }

    /// The owner grants `user`'s pending request.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if `caller` is not the owner; `InvalidState` with
    /// `not-pending` if `user` has no pending request.
    pub fn grant(
        &mut self,
        record: &EvidenceRecord,
        caller: &Identity,
        user: &Identity,
        now: Timestamp,
    ) -> Result<GrantEntry, RegistryError> {
        require_owner(record, caller, OwnerOperation::Grant)?;
        self.existing_list(record, user, InvalidStateReason::NotPending)?
            .grant(user, now)
            .map_err(|reason| invalid(record, user, reason))?;
        Ok(GrantEntry {
            user: user.clone(),
            granted_at: now,
        })
    }

    /// The owner rejects `user`'s pending request.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if `caller` is not the owner; `InvalidState` with
    /// `not-pending` if `user` has no pending request.
    pub fn deny(
        &mut self,
        record: &EvidenceRecord,
        caller: &Identity,
        user: &Identity,
    ) -> Result<(), RegistryError> {
        require_owner(record, caller, OwnerOperation::Deny)?;
        self.existing_list(record, user, InvalidStateReason::NotPending)?
            .deny(user)
            .map_err(|reason| invalid(record, user, reason))
    }

    /// The owner withdraws `user`'s grant.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if `caller` is not the owner; `InvalidState` with
    /// `not-granted` if `user` holds no grant.
    pub fn revoke(
        &mut self,
        record: &EvidenceRecord,
        caller: &Identity,
        user: &Identity,
    ) -> Result<(), RegistryError> {
        require_owner(record, caller, OwnerOperation::Revoke)?;
        self.existing_list(record, user, InvalidStateReason::NotGranted)?
            .revoke(user)
            .map_err(|reason| invalid(record, user, reason))
    }

    /// Mutable access list for a transition that needs prior state. A record
    /// without a list has no pending or granted users, so the transition
    /// fails with `reason` without creating one.
    fn existing_list(
        &mut self,
        record: &EvidenceRecord,
        user: &Identity,
        reason: InvalidStateReason,
    ) -> Result<&mut AccessList, RegistryError> {
        self.lists
            .get_mut(&record.id())
            .ok_or_else(|| invalid(record, user, reason))
    }
}

/// Reject `caller` unless it owns `record`.
pub(crate) fn require_owner(
    record: &EvidenceRecord,
    caller: &Identity,
    operation: OwnerOperation,
) -> Result<(), RegistryError> {
    if record.is_owner(caller) {
        Ok(())
    } else {
        Err(RegistryError::Unauthorized {
            evidence_id: record.id(),
            caller: caller.clone(),
            operation,
        })
    }
}

fn invalid(record: &EvidenceRecord, user: &Identity, reason: InvalidStateReason) -> RegistryError {
    RegistryError::InvalidState {
        evidence_id: record.id(),
        user: user.clone(),
        reason,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
