//! # Audit Log — Append-Only Hash Chain
//!
//! Pending and granted sets describe the *current* access situation; once a
//! request is denied or a grant revoked the user disappears from them. The
//! audit log keeps the history instead: it is an [`EventSink`] that appends
//! every registry event as an entry whose SHA-256 hash chains to the previous
//! entry, forming a tamper-evident record.
//!
//! ```text
//! entry_hash = SHA-256(previous_hash || sequence || recorded_at || canonical event fields)
//! ```
//!
//! The first entry chains to 64 zeros. Entries are never modified or removed.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use evreg_core::{EvidenceId, Timestamp};

use crate::events::{EventSink, RegistryEvent};

/// Previous-hash value of the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, starting at 1.
    pub sequence: u64,
    /// The recorded event.
    pub event: RegistryEvent,
    /// When the entry was appended.
    pub recorded_at: Timestamp,
    /// Hash of the preceding entry ([`GENESIS_HASH`] for the first).
    pub previous_hash: String,
    /// Hash of this entry.
    pub entry_hash: String,
}

/// Audit chain verification failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// An entry's `previous_hash` does not match its predecessor.
    #[error("audit chain broken at sequence {sequence}: previous hash mismatch")]
    BrokenLink {
        /// The offending entry.
        sequence: u64,
    },

    /// An entry's stored hash does not match its recomputed hash.
    #[error("audit entry {sequence} hash mismatch: expected {expected}, found {found}")]
    HashMismatch {
        /// The offending entry.
        sequence: u64,
        /// Hash recomputed from the entry's fields.
        expected: String,
        /// Hash stored in the entry.
        found: String,
    },

    /// Sequence numbers are not contiguous from 1.
    #[error("audit sequence gap: expected {expected}, found {found}")]
    SequenceGap {
        /// The sequence number that should have appeared.
        expected: u64,
        /// The sequence number that did appear.
        found: u64,
    },
}

/// Compute the hash of an entry from its parts.
pub fn entry_hash(
    previous_hash: &str,
    sequence: u64,
    recorded_at: &Timestamp,
    event: &RegistryEvent,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(sequence.to_be_bytes());
    hasher.update(recorded_at.to_canonical_string().as_bytes());
    hasher.update(event.canonical_fields().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Check a sequence of entries for contiguity and hash integrity.
///
/// # Errors
///
/// Returns the first [`AuditError`] found, walking from the start.
pub fn verify_entries(entries: &[AuditEntry]) -> Result<(), AuditError> {
    verify_suffix(entries, 0, GENESIS_HASH).map(|_| ())
}

/// Verify `entries[start..]`, where `previous` is the hash of entry `start`
/// (or [`GENESIS_HASH`] when `start` is 0). Returns the hash of the last
/// entry checked.
fn verify_suffix(
    entries: &[AuditEntry],
    start: usize,
    previous: &str,
) -> Result<String, AuditError> {
    let mut previous = previous.to_string();
    for (index, entry) in entries.iter().enumerate().skip(start) {
        let expected_sequence = index as u64 + 1;
        if entry.sequence != expected_sequence {
            return Err(AuditError::SequenceGap {
                expected: expected_sequence,
                found: entry.sequence,
            });
        }
        if entry.previous_hash != previous {
            return Err(AuditError::BrokenLink {
                sequence: entry.sequence,
            });
        }
        let expected = entry_hash(&previous, entry.sequence, &entry.recorded_at, &entry.event);
        if entry.entry_hash != expected {
            return Err(AuditError::HashMismatch {
                sequence: entry.sequence,
                expected,
                found: entry.entry_hash.clone(),
            });
        }
        previous = entry.entry_hash.clone();
    }
    Ok(previous)
}

/// Length and head hash of the prefix already verified.
#[derive(Debug)]
struct Checkpoint {
    len: usize,
    head: String,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            len: 0,
            head: GENESIS_HASH.to_string(),
        }
    }
}

/// In-memory append-only audit log.
///
/// Entries are private and never rewritten, so a prefix that verified once
/// stays valid; [`AuditLog::verify_chain`] only hashes entries appended
/// since the last successful call.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
    verified: Mutex<Checkpoint>,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return the new entry.
    pub fn append(&self, event: RegistryEvent) -> AuditEntry {
        let mut entries = self.entries.write();
        let previous_hash = entries
            .last()
            .map(|e| e.entry_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let sequence = entries.len() as u64 + 1;
        let recorded_at = Timestamp::now();
        let hash = entry_hash(&previous_hash, sequence, &recorded_at, &event);
        let entry = AuditEntry {
            sequence,
            event,
            recorded_at,
            previous_hash,
            entry_hash: hash,
        };
        entries.push(entry.clone());
        entry
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    /// Entries concerning one evidence record, oldest first.
    pub fn entries_for(&self, evidence_id: EvidenceId) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.event.evidence_id() == evidence_id)
            .cloned()
            .collect()
    }

    /// Hash of the latest entry ([`GENESIS_HASH`] when empty).
    pub fn head(&self) -> String {
        self.entries
            .read()
            .last()
            .map(|e| e.entry_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verify the chain, resuming after the last verified entry.
    ///
    /// # Errors
    ///
    /// Returns the first integrity violation found.
    pub fn verify_chain(&self) -> Result<(), AuditError> {
        let mut checkpoint = self.verified.lock();
        let entries = self.entries.read();
        let head = verify_suffix(&entries, checkpoint.len, &checkpoint.head)?;
        checkpoint.len = entries.len();
        checkpoint.head = head;
        Ok(())
    }

    /// Number of entries covered by the last successful [`verify_chain`](Self::verify_chain).
    pub fn verified_len(&self) -> usize {
        self.verified.lock().len
    }
}

impl EventSink for AuditLog {
    fn emit(&self, event: &RegistryEvent) {
        self.append(event.clone());
    }
}
