//! # Registry Store
//!
//! Holds evidence records and the append-only owner index. A record's
//! `owner`, `content_ref`, `key_blob`, `description`, and `created_at` are
//! private and exposed through getters only; the single mutable field is
//! `active`. Records are never removed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use evreg_core::{EvidenceId, Identity, Timestamp};

use crate::error::RegistryError;

/// Caller-supplied content of a new evidence record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Content-addressed handle into the external content store.
    pub content_ref: String,
    /// Wrapped decryption material for the referenced content.
    pub key_blob: String,
    /// Free-text description, visible to every caller.
    #[serde(default)]
    pub description: String,
}

/// An evidence record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    id: EvidenceId,
    owner: Identity,
    content_ref: String,
    key_blob: String,
    description: String,
    created_at: Timestamp,
    active: bool,
}

impl EvidenceRecord {
    fn new(id: EvidenceId, owner: Identity, submission: Submission, created_at: Timestamp) -> Self {
        Self {
            id,
            owner,
            content_ref: submission.content_ref,
            key_blob: submission.key_blob,
            description: submission.description,
            created_at,
            active: true,
        }
    }

    /// The record's identifier.
    pub fn id(&self) -> EvidenceId {
        self.id
    }

    /// The identity that submitted the record.
    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Whether `who` owns this record.
    pub fn is_owner(&self, who: &Identity) -> bool {
        self.owner == *who
    }

    /// Content-addressed handle. Sensitive: route reads through the view layer.
    pub fn content_ref(&self) -> &str {
        &self.content_ref
    }

    /// Wrapped key material. Sensitive: route reads through the view layer.
    pub fn key_blob(&self) -> &str {
        &self.key_blob
    }

    /// Free-text description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// When the record was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Whether the record is marked current.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Evidence records keyed by id, plus the owner → ids index.
#[derive(Debug, Default)]
pub struct RegistryStore {
    records: HashMap<EvidenceId, EvidenceRecord>,
    by_owner: HashMap<Identity, Vec<EvidenceId>>,
}

impl RegistryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new record under an id issued by the allocator.
    ///
    /// The id must be fresh; the allocator guarantees this.
    pub fn create(
        &mut self,
        id: EvidenceId,
        owner: Identity,
        submission: Submission,
        created_at: Timestamp,
    ) -> &EvidenceRecord {
        debug_assert!(!self.records.contains_key(&id), "allocator reissued {id}");
        self.by_owner.entry(owner.clone()).or_default().push(id);
        self.records
            .entry(id)
            .or_insert_with(|| EvidenceRecord::new(id, owner, submission, created_at))
    }

    /// Look up a record.
    pub fn get(&self, id: EvidenceId) -> Result<&EvidenceRecord, RegistryError> {
        self.records.get(&id).ok_or(RegistryError::NotFound(id))
    }

    /// Ids owned by `owner`, in submission order.
    pub fn list_by_owner(&self, owner: &Identity) -> &[EvidenceId] {
        self.by_owner.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Set the `active` flag. Returns the previous value.
    pub fn set_active(&mut self, id: EvidenceId, active: bool) -> Result<bool, RegistryError> {
        let record = self.records.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        Ok(std::mem::replace(&mut record.active, active))
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
