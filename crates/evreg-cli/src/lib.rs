//! # evreg-cli — Command-Line Tool for the Evidence Registry
//!
//! ## Subcommands
//!
//! - `evreg replay` — Run a YAML scenario of submissions, requests, and
//!   owner decisions against a fresh in-memory registry, check each step's
//!   expected outcome, and verify the audit chain it produced.
//!
//! ```bash
//! evreg replay demos/walkthrough.yaml
//! evreg replay demos/walkthrough.yaml --json
//! ```

pub mod replay;
