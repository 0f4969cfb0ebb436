#![deny(missing_docs)]

//! # evreg-state — Evidence Registry Core
//!
//! Records, permissions, and the events that connect them.
//!
//! - [`RegistryStore`] holds immutable evidence records and the per-owner
//!   index. Only the `active` flag ever changes after submission.
//! - [`PermissionLedger`] tracks a [`PermissionState`] per `(evidence, user)`
//!   pair and mirrors it into pending and granted collections with O(1)
//!   insertion and removal.
//! - [`EvidenceRegistry`] is the facade: it checks existence, ownership, and
//!   state in that order, applies the transition, then hands the resulting
//!   [`RegistryEvent`] to an [`EventSink`].
//! - [`AuditLog`] is a sink that keeps every event in a SHA-256 hash chain.
//! - [`EvidenceView`] is the redacted projection served to callers.
//!
//! ## Permission lifecycle
//!
//! ```text
//!            request              grant
//!   NONE ───────────▶ PENDING ───────────▶ GRANTED
//!    ▲                   │                    │
//!    │       deny        │       revoke       │
//!    └───────────────────┴────────────────────┘
//! ```
//!
//! The owner of a record is never in either collection.

pub mod allocator;
pub mod audit;
pub mod error;
pub mod events;
pub mod evidence;
pub mod indexed_set;
pub mod permission;
pub mod registry;
pub mod view;

pub use allocator::{IdAllocator, SequentialAllocator};
pub use audit::{AuditEntry, AuditError, AuditLog, GENESIS_HASH};
pub use error::{InvalidStateReason, OwnerOperation, RegistryError};
pub use events::{EventSink, FanoutSink, MemorySink, NoopSink, RegistryEvent, TracingSink};
pub use evidence::{EvidenceRecord, RegistryStore, Submission};
pub use indexed_set::IndexedSet;
pub use permission::{AccessList, GrantEntry, PermissionLedger, PermissionState};
pub use registry::EvidenceRegistry;
pub use view::EvidenceView;
