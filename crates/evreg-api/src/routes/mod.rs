//! # API Route Modules
//!
//! - `evidence` — submission, redacted views, and the `active` flag.
//! - `access` — access requests, owner decisions, and permission queries.
//! - `audit` — per-record audit history, owner only.
//! - `owners` — evidence ids by owner.

pub mod access;
pub mod audit;
pub mod evidence;
pub mod owners;
