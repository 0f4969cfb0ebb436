//! # Ledger Properties
//!
//! Random operation sequences against the registry, checking after every
//! step that the permission state and the pending/granted collections agree
//! and that rejected operations leave no trace.

use std::sync::Arc;

use evreg_core::{EvidenceId, Identity};
use evreg_state::{AuditLog, EvidenceRegistry, PermissionState, RegistryError, Submission};
use proptest::prelude::*;

const USERS: [&str; 4] = ["alice", "bob", "carol", "dave"];

#[derive(Debug, Clone)]
enum Op {
    Submit { owner: usize },
    Request { id: u64, user: usize },
    Grant { id: u64, caller: usize, user: usize },
    Deny { id: u64, caller: usize, user: usize },
    Revoke { id: u64, caller: usize, user: usize },
    SetActive { id: u64, caller: usize, active: bool },
}

fn user() -> impl Strategy<Value = usize> {
    0..USERS.len()
}

// Ids up to 5 so that some operations target records that do not exist.
fn evidence() -> impl Strategy<Value = u64> {
    1u64..=5
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => user().prop_map(|owner| Op::Submit { owner }),
        3 => (evidence(), user()).prop_map(|(id, user)| Op::Request { id, user }),
        3 => (evidence(), user(), user()).prop_map(|(id, caller, user)| Op::Grant { id, caller, user }),
        2 => (evidence(), user(), user()).prop_map(|(id, caller, user)| Op::Deny { id, caller, user }),
        2 => (evidence(), user(), user()).prop_map(|(id, caller, user)| Op::Revoke { id, caller, user }),
        1 => (evidence(), user(), any::<bool>())
            .prop_map(|(id, caller, active)| Op::SetActive { id, caller, active }),
    ]
}

fn who(i: usize) -> Identity {
    Identity::new(USERS[i]).unwrap()
}

fn eid(n: u64) -> EvidenceId {
    EvidenceId::new(n).unwrap()
}

/// Observable state of every record, as seen by its owner.
#[derive(Debug, PartialEq)]
struct Snapshot {
    count: usize,
    records: Vec<(Vec<Identity>, Vec<Identity>, Vec<PermissionState>, bool)>,
}

fn snapshot(reg: &EvidenceRegistry) -> Snapshot {
    let mut records = Vec::new();
    for n in 1..=reg.evidence_count() as u64 {
        let id = eid(n);
        let owner = reg.get(id).unwrap().owner().clone();
        let pending = reg.list_pending(id, &owner).unwrap();
        let granted = reg.list_granted(id, &owner).unwrap();
        let states = (0..USERS.len())
            .map(|u| reg.permission_state(id, &owner, &who(u)).unwrap())
            .collect();
        records.push((pending, granted, states, reg.get(id).unwrap().is_active()));
    }
    Snapshot {
        count: reg.evidence_count(),
        records,
    }
}

fn apply(reg: &mut EvidenceRegistry, op: &Op) -> Result<(), RegistryError> {
    match *op {
        Op::Submit { owner } => reg
            .submit(
                &who(owner),
                Submission {
                    content_ref: "Qm".to_string(),
                    key_blob: "k".to_string(),
                    description: String::new(),
                },
            )
            .map(|_| ()),
        Op::Request { id, user } => reg.request_access(eid(id), &who(user)),
        Op::Grant { id, caller, user } => reg
            .grant_access(eid(id), &who(caller), &who(user))
            .map(|_| ()),
        Op::Deny { id, caller, user } => reg.deny_access(eid(id), &who(caller), &who(user)),
        Op::Revoke { id, caller, user } => reg.revoke_access(eid(id), &who(caller), &who(user)),
        Op::SetActive { id, caller, active } => reg.set_active(eid(id), &who(caller), active),
    }
}

fn check_invariants(reg: &EvidenceRegistry) -> Result<(), TestCaseError> {
    for n in 1..=reg.evidence_count() as u64 {
        let id = eid(n);
        let owner = reg.get(id).unwrap().owner().clone();
        let pending = reg.list_pending(id, &owner).unwrap();
        let granted = reg.list_granted(id, &owner).unwrap();

        prop_assert!(reg.has_permission(id, &owner).unwrap());
        prop_assert!(!pending.contains(&owner));
        prop_assert!(!granted.contains(&owner));
        for u in &pending {
            prop_assert!(!granted.contains(u), "{u} both pending and granted on {id}");
        }

        for i in 0..USERS.len() {
            let user = who(i);
            let state = reg.permission_state(id, &owner, &user).unwrap();
            prop_assert_eq!(state == PermissionState::Pending, pending.contains(&user));
            prop_assert_eq!(state == PermissionState::Granted, granted.contains(&user));
            let view = reg.view(id, &user).unwrap();
            let allowed = reg.has_permission(id, &user).unwrap();
            prop_assert_eq!(view.is_redacted(), !allowed);
            prop_assert_eq!(view.has_requested, state == PermissionState::Pending);
        }

        let mut deduped = pending.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), pending.len());
    }
    Ok(())
}

proptest! {
    /// Pending and granted mirror the per-user state after every operation.
    #[test]
    fn collections_mirror_state(ops in prop::collection::vec(op(), 1..60)) {
        let mut reg = EvidenceRegistry::new();
        for op in &ops {
            let _ = apply(&mut reg, op);
            check_invariants(&reg)?;
        }
    }

    /// A rejected operation changes nothing, and retrying it fails identically.
    #[test]
    fn rejected_operations_leave_state_unchanged(ops in prop::collection::vec(op(), 1..60)) {
        let mut reg = EvidenceRegistry::new();
        for op in &ops {
            let before = snapshot(&reg);
            if let Err(first) = apply(&mut reg, op) {
                prop_assert_eq!(&snapshot(&reg), &before);
                let second = apply(&mut reg, op).unwrap_err();
                prop_assert_eq!(first, second);
            }
        }
    }

    /// Ids are issued 1, 2, 3, ... regardless of interleaved operations.
    #[test]
    fn ids_strictly_increase_from_one(ops in prop::collection::vec(op(), 1..60)) {
        let mut reg = EvidenceRegistry::new();
        let mut expected = 1u64;
        for op in &ops {
            if let Op::Submit { owner } = *op {
                let id = reg
                    .submit(&who(owner), Submission {
                        content_ref: format!("Qm{expected}"),
                        key_blob: String::new(),
                        description: String::new(),
                    })
                    .unwrap();
                prop_assert_eq!(id.get(), expected);
                expected += 1;
            } else {
                let _ = apply(&mut reg, op);
            }
        }
    }

    /// The audit chain records exactly the accepted operations and verifies.
    #[test]
    fn audit_chain_counts_accepted_operations(ops in prop::collection::vec(op(), 1..40)) {
        let audit = Arc::new(AuditLog::new());
        let mut reg = EvidenceRegistry::with_sink(audit.clone());
        let mut accepted = 0usize;
        for op in &ops {
            if apply(&mut reg, op).is_ok() {
                accepted += 1;
            }
        }
        prop_assert_eq!(audit.len(), accepted);
        prop_assert!(audit.verify_chain().is_ok());
    }
}

#[test]
fn owner_walkthrough_request_grant_revoke_deny() {
    let mut reg = EvidenceRegistry::new();
    let (a, b) = (who(0), who(1));
    let id = reg
        .submit(
            &a,
            Submission {
                content_ref: "Qm123".to_string(),
                key_blob: "wrapped-key".to_string(),
                description: "dashcam".to_string(),
            },
        )
        .unwrap();
    assert_eq!(id.get(), 1);

    reg.request_access(id, &b).unwrap();
    assert_eq!(reg.list_pending(id, &a).unwrap(), vec![b.clone()]);

    reg.grant_access(id, &a, &b).unwrap();
    assert_eq!(reg.list_granted(id, &a).unwrap(), vec![b.clone()]);
    assert!(reg.list_pending(id, &a).unwrap().is_empty());
    assert_eq!(reg.view(id, &b).unwrap().content_ref, "Qm123");

    let again = reg.request_access(id, &b).unwrap_err();
    assert!(matches!(again, RegistryError::InvalidState { .. }));

    reg.revoke_access(id, &a, &b).unwrap();
    assert!(reg.list_granted(id, &a).unwrap().is_empty());
    assert_eq!(reg.view(id, &b).unwrap().content_ref, "");

    reg.request_access(id, &b).unwrap();
    assert_eq!(reg.list_pending(id, &a).unwrap(), vec![b.clone()]);

    reg.deny_access(id, &a, &b).unwrap();
    assert!(reg.list_pending(id, &a).unwrap().is_empty());
    assert_eq!(
        reg.permission_state(id, &a, &b).unwrap(),
        PermissionState::None
    );
}

#[test]
fn grant_order_survives_removal_from_the_middle() {
    let mut reg = EvidenceRegistry::new();
    let owner = who(0);
    let id = reg
        .submit(
            &owner,
            Submission {
                content_ref: "Qm".into(),
                key_blob: "k".into(),
                description: String::new(),
            },
        )
        .unwrap();
    for u in 1..4 {
        reg.request_access(id, &who(u)).unwrap();
    }
    reg.deny_access(id, &owner, &who(1)).unwrap();
    // The last requester takes the vacated slot.
    assert_eq!(reg.list_pending(id, &owner).unwrap(), vec![who(3), who(2)]);
}
