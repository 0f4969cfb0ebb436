//! # Evidence Registry
//!
//! The facade that composes the allocator, the store, the permission ledger,
//! and an event sink into the operation surface of the registry.
//!
//! ## Atomicity
//!
//! Mutating methods take `&mut self`; callers that share a registry wrap it
//! in a lock so conflicting calls are serialized. Inside each method every
//! precondition is checked before the first write, and the event is emitted
//! only after the transition is applied. A failed call therefore changes
//! nothing and emits nothing, and repeating it against the same state fails
//! the same way.
//!
//! ## Check order
//!
//! Owner-only operations report `NotFound` before `Unauthorized` (the owner
//! is only known once the record is found), then `InvalidState`.

use std::sync::Arc;

use evreg_core::{EvidenceId, Identity, Timestamp};

use crate::allocator::{IdAllocator, SequentialAllocator};
use crate::error::{OwnerOperation, RegistryError};
use crate::events::{EventSink, NoopSink, RegistryEvent};
use crate::evidence::{EvidenceRecord, RegistryStore, Submission};
use crate::permission::{require_owner, GrantEntry, PermissionLedger, PermissionState};
use crate::view::EvidenceView;

/// The evidence access-control registry.
pub struct EvidenceRegistry<A: IdAllocator = SequentialAllocator> {
    allocator: A,
    store: RegistryStore,
    ledger: PermissionLedger,
    sink: Arc<dyn EventSink>,
}

impl EvidenceRegistry<SequentialAllocator> {
    /// Registry with a sequential allocator and no event observers.
    pub fn new() -> Self {
        Self::with_parts(SequentialAllocator::new(), Arc::new(NoopSink))
    }

    /// Registry with a sequential allocator delivering events to `sink`.
    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self::with_parts(SequentialAllocator::new(), sink)
    }
}

impl Default for EvidenceRegistry<SequentialAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: IdAllocator> std::fmt::Debug for EvidenceRegistry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceRegistry")
            .field("allocator", &self.allocator)
            .field("records", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl<A: IdAllocator> EvidenceRegistry<A> {
    /// Registry over an explicit allocator and sink.
    pub fn with_parts(allocator: A, sink: Arc<dyn EventSink>) -> Self {
        Self {
            allocator,
            store: RegistryStore::new(),
            ledger: PermissionLedger::new(),
            sink,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create a record owned by `owner`. Returns the new id.
    ///
    /// # Errors
    ///
    /// [`RegistryError::IdSpaceExhausted`] only.
    pub fn submit(
        &mut self,
        owner: &Identity,
        submission: Submission,
    ) -> Result<EvidenceId, RegistryError> {
        let id = self.allocator.next_id()?;
        let record = self
            .store
            .create(id, owner.clone(), submission, Timestamp::now());
        let event = RegistryEvent::Submitted {
            evidence_id: id,
            owner: owner.clone(),
            content_ref: record.content_ref().to_string(),
        };
        tracing::debug!(evidence_id = %id, owner = %owner, "evidence submitted");
        self.sink.emit(&event);
        Ok(id)
    }

    /// `requester` asks the owner of `id` for access.
    ///
    /// # Errors
    ///
    /// `NotFound`; `InvalidState` with `self-request`, `already-pending`, or
    /// `already-granted`.
    pub fn request_access(
        &mut self,
        id: EvidenceId,
        requester: &Identity,
    ) -> Result<(), RegistryError> {
        let record = self.store.get(id)?;
        self.ledger
            .request(record, requester)
            .map_err(rejected)?;
        self.sink.emit(&RegistryEvent::Requested {
            evidence_id: id,
            requester: requester.clone(),
        });
        Ok(())
    }

    /// The owner grants `user`'s pending request.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized`; `InvalidState` with `not-pending`.
    pub fn grant_access(
        &mut self,
        id: EvidenceId,
        caller: &Identity,
        user: &Identity,
    ) -> Result<GrantEntry, RegistryError> {
        let record = self.store.get(id)?;
        let entry = self
            .ledger
            .grant(record, caller, user, Timestamp::now())
            .map_err(rejected)?;
        self.sink.emit(&RegistryEvent::Granted {
            evidence_id: id,
            owner: caller.clone(),
            user: user.clone(),
            granted_at: entry.granted_at,
        });
        Ok(entry)
    }

    /// The owner rejects `user`'s pending request.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized`; `InvalidState` with `not-pending`.
    pub fn deny_access(
        &mut self,
        id: EvidenceId,
        caller: &Identity,
        user: &Identity,
    ) -> Result<(), RegistryError> {
        let record = self.store.get(id)?;
        self.ledger
            .deny(record, caller, user)
            .map_err(rejected)?;
        self.sink.emit(&RegistryEvent::Denied {
            evidence_id: id,
            owner: caller.clone(),
            user: user.clone(),
        });
        Ok(())
    }

    /// The owner withdraws `user`'s grant.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized`; `InvalidState` with `not-granted`.
    pub fn revoke_access(
        &mut self,
        id: EvidenceId,
        caller: &Identity,
        user: &Identity,
    ) -> Result<(), RegistryError> {
        let record = self.store.get(id)?;
        self.ledger
            .revoke(record, caller, user)
            .map_err(rejected)?;
        self.sink.emit(&RegistryEvent::Revoked {
            evidence_id: id,
            owner: caller.clone(),
            user: user.clone(),
        });
        Ok(())
    }

    /// The owner marks the record current or non-current. Writing the value
    /// the flag already holds is accepted and still emits an event.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized`.
    pub fn set_active(
        &mut self,
        id: EvidenceId,
        caller: &Identity,
        active: bool,
    ) -> Result<(), RegistryError> {
        let record = self.store.get(id)?;
        require_owner(record, caller, OwnerOperation::SetActive).map_err(rejected)?;
        self.store.set_active(id, active)?;
        self.sink.emit(&RegistryEvent::ActiveChanged {
            evidence_id: id,
            owner: caller.clone(),
            active,
        });
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The full record. Sensitive fields are included; use [`Self::view`]
    /// for anything that leaves the process.
    ///
    /// # Errors
    ///
    /// `NotFound`.
    pub fn get(&self, id: EvidenceId) -> Result<&EvidenceRecord, RegistryError> {
        self.store.get(id)
    }

    /// The record as seen by `caller`.
    ///
    /// # Errors
    ///
    /// `NotFound`.
    pub fn view(&self, id: EvidenceId, caller: &Identity) -> Result<EvidenceView, RegistryError> {
        let record = self.store.get(id)?;
        let state = self.ledger.state(record, caller);
        Ok(EvidenceView::project(record, caller, state))
    }

    /// Pending requesters, owner only.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized`.
    pub fn list_pending(
        &self,
        id: EvidenceId,
        caller: &Identity,
    ) -> Result<Vec<Identity>, RegistryError> {
        let record = self.store.get(id)?;
        require_owner(record, caller, OwnerOperation::ListPending)?;
        Ok(self.ledger.pending(record).to_vec())
    }

    /// Granted users, owner only.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized`.
    pub fn list_granted(
        &self,
        id: EvidenceId,
        caller: &Identity,
    ) -> Result<Vec<Identity>, RegistryError> {
        let record = self.store.get(id)?;
        require_owner(record, caller, OwnerOperation::ListGranted)?;
        Ok(self.ledger.granted(record).to_vec())
    }

    /// Granted users with grant times, owner only.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized`.
    pub fn list_grants(
        &self,
        id: EvidenceId,
        caller: &Identity,
    ) -> Result<Vec<GrantEntry>, RegistryError> {
        let record = self.store.get(id)?;
        require_owner(record, caller, OwnerOperation::ListGranted)?;
        Ok(self.ledger.grants(record))
    }

    /// Ids owned by `owner`, in submission order.
    pub fn list_by_owner(&self, owner: &Identity) -> Vec<EvidenceId> {
        self.store.list_by_owner(owner).to_vec()
    }

    /// Whether `user` may read the sensitive fields of `id`. No caller check.
    ///
    /// # Errors
    ///
    /// `NotFound`.
    pub fn has_permission(&self, id: EvidenceId, user: &Identity) -> Result<bool, RegistryError> {
        let record = self.store.get(id)?;
        Ok(self.ledger.has_permission(record, user))
    }

    /// `user`'s permission state. Readable by the owner and by `user`.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized` for any other caller.
    pub fn permission_state(
        &self,
        id: EvidenceId,
        caller: &Identity,
        user: &Identity,
    ) -> Result<PermissionState, RegistryError> {
        let record = self.store.get(id)?;
        if caller != user {
            require_owner(record, caller, OwnerOperation::ReadPermissionState)?;
        }
        Ok(self.ledger.state(record, user))
    }

    /// Fail unless `caller` owns `id`. For owner-only reads served outside
    /// the registry, such as the audit trail.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized`.
    pub fn require_owner(
        &self,
        id: EvidenceId,
        caller: &Identity,
        operation: OwnerOperation,
    ) -> Result<(), RegistryError> {
        let record = self.store.get(id)?;
        require_owner(record, caller, operation)
    }

    /// Number of records.
    pub fn evidence_count(&self) -> usize {
        self.store.len()
    }

    /// The most recently issued id.
    pub fn last_id(&self) -> Option<EvidenceId> {
        self.allocator.last_issued()
    }
}

fn rejected(err: RegistryError) -> RegistryError {
    tracing::debug!(error = %err, "registry transition rejected");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::SequentialAllocator;
    use crate::error::InvalidStateReason;
    use crate::events::MemorySink;

    fn who(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    fn submission(content_ref: &str) -> Submission {
        Submission {
            content_ref: content_ref.to_string(),
            key_blob: format!("key-for-{content_ref}"),
            description: "exhibit".to_string(),
        }
    }

    fn registry() -> (EvidenceRegistry, MemorySink) {
        let sink = MemorySink::new();
        (EvidenceRegistry::with_sink(Arc::new(sink.clone())), sink)
    }

    #[test]
    fn submit_issues_ids_from_one_and_indexes_owner() {
        let (mut reg, sink) = registry();
        let a = reg.submit(&who("alice"), submission("Qm1")).unwrap();
        let b = reg.submit(&who("bob"), submission("Qm2")).unwrap();
        let c = reg.submit(&who("alice"), submission("Qm3")).unwrap();
        assert_eq!([a.get(), b.get(), c.get()], [1, 2, 3]);
        assert_eq!(reg.list_by_owner(&who("alice")), vec![a, c]);
        assert_eq!(reg.evidence_count(), 3);
        assert_eq!(reg.last_id(), Some(c));
        assert_eq!(sink.len(), 3);
        assert!(matches!(
            &sink.events()[0],
            RegistryEvent::Submitted { content_ref, .. } if content_ref == "Qm1"
        ));
    }

    #[test]
    fn exhausted_allocator_fails_submit_without_side_effects() {
        let sink = MemorySink::new();
        let mut reg =
            EvidenceRegistry::with_parts(SequentialAllocator::with_limit(1), Arc::new(sink.clone()));
        reg.submit(&who("alice"), submission("Qm1")).unwrap();
        let err = reg.submit(&who("alice"), submission("Qm2")).unwrap_err();
        assert_eq!(err, RegistryError::IdSpaceExhausted);
        assert_eq!(reg.evidence_count(), 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn unknown_id_is_not_found_everywhere() {
        let (mut reg, sink) = registry();
        let missing = EvidenceId::new(99).unwrap();
        let nf = RegistryError::NotFound(missing);
        assert_eq!(reg.request_access(missing, &who("bob")), Err(nf.clone()));
        assert_eq!(
            reg.grant_access(missing, &who("alice"), &who("bob")),
            Err(nf.clone())
        );
        assert_eq!(reg.deny_access(missing, &who("alice"), &who("bob")), Err(nf.clone()));
        assert_eq!(reg.revoke_access(missing, &who("alice"), &who("bob")), Err(nf.clone()));
        assert_eq!(reg.view(missing, &who("bob")), Err(nf.clone()));
        assert_eq!(reg.list_pending(missing, &who("alice")), Err(nf.clone()));
        assert_eq!(reg.has_permission(missing, &who("bob")), Err(nf));
        assert!(sink.is_empty());
    }

    #[test]
    fn failed_operations_emit_nothing() {
        let (mut reg, sink) = registry();
        let id = reg.submit(&who("alice"), submission("Qm1")).unwrap();
        let before = sink.len();
        assert!(reg.request_access(id, &who("alice")).is_err());
        assert!(reg.grant_access(id, &who("alice"), &who("bob")).is_err());
        assert!(reg.deny_access(id, &who("bob"), &who("bob")).is_err());
        assert!(reg.revoke_access(id, &who("alice"), &who("bob")).is_err());
        assert!(reg.set_active(id, &who("bob"), false).is_err());
        assert_eq!(sink.len(), before);
    }

    #[test]
    fn failure_is_deterministic_on_retry() {
        let (mut reg, _) = registry();
        let id = reg.submit(&who("alice"), submission("Qm1")).unwrap();
        reg.request_access(id, &who("bob")).unwrap();
        let first = reg.request_access(id, &who("bob")).unwrap_err();
        let second = reg.request_access(id, &who("bob")).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(
            first.invalid_state_reason(),
            Some(InvalidStateReason::AlreadyPending)
        );
    }

    #[test]
    fn owner_only_queries_reject_strangers() {
        let (mut reg, _) = registry();
        let id = reg.submit(&who("alice"), submission("Qm1")).unwrap();
        assert!(matches!(
            reg.list_pending(id, &who("bob")),
            Err(RegistryError::Unauthorized {
                operation: OwnerOperation::ListPending,
                ..
            })
        ));
        assert!(matches!(
            reg.list_granted(id, &who("bob")),
            Err(RegistryError::Unauthorized { .. })
        ));
        assert!(matches!(
            reg.list_grants(id, &who("bob")),
            Err(RegistryError::Unauthorized { .. })
        ));
    }

    #[test]
    fn permission_state_visible_to_owner_and_self_only() {
        let (mut reg, _) = registry();
        let id = reg.submit(&who("alice"), submission("Qm1")).unwrap();
        reg.request_access(id, &who("bob")).unwrap();
        assert_eq!(
            reg.permission_state(id, &who("alice"), &who("bob")),
            Ok(PermissionState::Pending)
        );
        assert_eq!(
            reg.permission_state(id, &who("bob"), &who("bob")),
            Ok(PermissionState::Pending)
        );
        assert!(matches!(
            reg.permission_state(id, &who("carol"), &who("bob")),
            Err(RegistryError::Unauthorized {
                operation: OwnerOperation::ReadPermissionState,
                ..
            })
        ));
    }

    #[test]
    fn set_active_is_owner_only_and_keeps_history_queryable() {
        let (mut reg, sink) = registry();
        let id = reg.submit(&who("alice"), submission("Qm1")).unwrap();
        reg.request_access(id, &who("bob")).unwrap();
        reg.set_active(id, &who("alice"), false).unwrap();
        assert!(!reg.view(id, &who("bob")).unwrap().active);
        // Permission operations remain legal on inactive records.
        reg.grant_access(id, &who("alice"), &who("bob")).unwrap();
        assert!(reg.has_permission(id, &who("bob")).unwrap());
        assert!(matches!(
            sink.events().last(),
            Some(RegistryEvent::Granted { .. })
        ));
        assert!(matches!(
            reg.set_active(id, &who("bob"), true),
            Err(RegistryError::Unauthorized {
                operation: OwnerOperation::SetActive,
                ..
            })
        ));
    }

    #[test]
    fn view_redaction_tracks_permission() {
        let (mut reg, _) = registry();
        let id = reg.submit(&who("alice"), submission("Qm1")).unwrap();
        let bob = who("bob");
        assert!(reg.view(id, &bob).unwrap().is_redacted());
        reg.request_access(id, &bob).unwrap();
        let pending_view = reg.view(id, &bob).unwrap();
        assert!(pending_view.has_requested);
        assert_eq!(pending_view.key_blob, "");
        reg.grant_access(id, &who("alice"), &bob).unwrap();
        let granted_view = reg.view(id, &bob).unwrap();
        assert_eq!(granted_view.content_ref, "Qm1");
        assert_eq!(granted_view.key_blob, "key-for-Qm1");
        assert!(!granted_view.has_requested);
    }

    #[test]
    fn events_carry_actor_and_subject() {
        let (mut reg, sink) = registry();
        let id = reg.submit(&who("alice"), submission("Qm1")).unwrap();
        reg.request_access(id, &who("bob")).unwrap();
        reg.grant_access(id, &who("alice"), &who("bob")).unwrap();
        reg.revoke_access(id, &who("alice"), &who("bob")).unwrap();
        reg.request_access(id, &who("bob")).unwrap();
        reg.deny_access(id, &who("alice"), &who("bob")).unwrap();
        let kinds: Vec<_> = sink.events().iter().map(RegistryEvent::kind).collect();
        assert_eq!(
            kinds,
            ["submitted", "requested", "granted", "revoked", "requested", "denied"]
        );
        for event in sink.events() {
            assert_eq!(event.evidence_id(), id);
        }
    }
}
