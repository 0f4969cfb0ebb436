#![deny(missing_docs)]

//! # evreg-core — Foundational Types for the Evidence Registry
//!
//! This crate defines the types every other crate in the workspace depends on.
//! It has no internal crate dependencies. External ones are `serde`,
//! `serde_json`, `thiserror` and `chrono`.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** An [`Identity`] is not a
//!    bare string and an [`EvidenceId`] is not a bare integer. You cannot pass
//!    one where the other is expected.
//!
//! 2. **Validated construction.** Identities are checked once, at the
//!    boundary, so the registry core never has to re-validate them.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] carries second precision and
//!    renders with a `Z` suffix.
//!
//! 4. **[`EvregError`] hierarchy.** Structured errors with `thiserror`
//!    instead of `Box<dyn Error>`.

pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{EvregError, ValidationError};
pub use identity::{EvidenceId, Identity, MAX_IDENTITY_LEN};
pub use temporal::Timestamp;
