//! # Replay Subcommand
//!
//! Executes a scenario file against a fresh in-memory registry. Each step
//! names one registry operation and, optionally, what it should produce:
//!
//! ```yaml
//! name: request, grant, revoke
//! steps:
//!   - submit: { owner: alice, content_ref: Qm123, key_blob: k1 }
//!     expect: { id: 1 }
//!   - request: { id: 1, user: bob }
//!   - grant: { id: 1, caller: alice, user: bob }
//!   - view: { id: 1, caller: bob }
//!     expect: { content_ref: Qm123 }
//!   - request: { id: 1, user: bob }
//!     expect_error: already-granted
//! ```
//!
//! `expect_error` accepts an error kind (`not-found`, `unauthorized`,
//! `invalid-state`, `validation`) or an invalid-state reason such as
//! `not-pending`. A step without `expect_error` must succeed.
//!
//! After the last step the audit chain is verified. The exit code is 0 only
//! when every step matched and the chain verifies.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use evreg_core::{EvidenceId, Identity, ValidationError};
use evreg_state::{
    AuditEntry, AuditLog, EvidenceRegistry, EvidenceView, FanoutSink, PermissionState,
    RegistryError, Submission, TracingSink,
};

/// Arguments for `evreg replay`.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to the YAML scenario.
    pub scenario: PathBuf,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

// ─── Scenario format ────────────────────────────────────────────────

/// A named sequence of steps.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

/// One operation plus its expected outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    #[serde(default)]
    pub expect: Option<Expectation>,
    #[serde(default)]
    pub expect_error: Option<String>,
}

/// A registry operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Submit {
        owner: String,
        content_ref: String,
        #[serde(default)]
        key_blob: String,
        #[serde(default)]
        description: String,
    },
    Request {
        id: u64,
        user: String,
    },
    Grant {
        id: u64,
        caller: String,
        user: String,
    },
    Deny {
        id: u64,
        caller: String,
        user: String,
    },
    Revoke {
        id: u64,
        caller: String,
        user: String,
    },
    SetActive {
        id: u64,
        caller: String,
        active: bool,
    },
    View {
        id: u64,
        caller: String,
    },
    Pending {
        id: u64,
        caller: String,
    },
    Granted {
        id: u64,
        caller: String,
    },
    Permission {
        id: u64,
        caller: String,
        user: String,
    },
}

impl Action {
    fn describe(&self) -> String {
        match self {
            Self::Submit {
                owner, content_ref, ..
            } => format!("submit {owner} {content_ref}"),
            Self::Request { id, user } => format!("request {id} by {user}"),
            Self::Grant { id, caller, user } => format!("grant {id} {caller} -> {user}"),
            Self::Deny { id, caller, user } => format!("deny {id} {caller} -> {user}"),
            Self::Revoke { id, caller, user } => format!("revoke {id} {caller} -> {user}"),
            Self::SetActive { id, caller, active } => {
                format!("set_active {id} {caller} = {active}")
            }
            Self::View { id, caller } => format!("view {id} as {caller}"),
            Self::Pending { id, caller } => format!("pending {id} as {caller}"),
            Self::Granted { id, caller } => format!("granted {id} as {caller}"),
            Self::Permission { id, caller, user } => {
                format!("permission {id} of {user} as {caller}")
            }
        }
    }
}

/// Fields checked against a successful outcome. Absent fields are not checked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Expectation {
    /// Id returned by `submit`.
    pub id: Option<u64>,
    /// `content_ref` of a view; empty means redacted.
    pub content_ref: Option<String>,
    pub has_access: Option<bool>,
    pub has_requested: Option<bool>,
    pub active: Option<bool>,
    /// Identities returned by `pending` or `granted`, in order.
    pub users: Option<Vec<String>>,
    /// `NONE`, `PENDING` or `GRANTED`, returned by `permission`.
    pub state: Option<String>,
}

// ─── Execution ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl StepError {
    fn matches(&self, expected: &str) -> bool {
        match self {
            Self::Validation(_) => expected == "validation",
            Self::Registry(err) => {
                let kind = match err {
                    RegistryError::NotFound(_) => "not-found",
                    RegistryError::Unauthorized { .. } => "unauthorized",
                    RegistryError::InvalidState { .. } => "invalid-state",
                    RegistryError::IdSpaceExhausted => "id-space-exhausted",
                };
                kind == expected
                    || err
                        .invalid_state_reason()
                        .is_some_and(|reason| reason.as_str() == expected)
            }
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Submitted(EvidenceId),
    Done,
    View(EvidenceView),
    Users(Vec<Identity>),
    State {
        has_permission: bool,
        state: PermissionState,
    },
}

impl Outcome {
    fn summary(&self) -> String {
        match self {
            Self::Submitted(id) => format!("id {id}"),
            Self::Done => "ok".to_string(),
            Self::View(view) if view.is_redacted() => "view (redacted)".to_string(),
            Self::View(view) => format!("view content_ref={}", view.content_ref),
            Self::Users(users) => format!(
                "[{}]",
                users.iter().map(Identity::as_str).collect::<Vec<_>>().join(", ")
            ),
            Self::State {
                has_permission,
                state,
            } => format!("{state} (has_permission={has_permission})"),
        }
    }

    fn mismatches(&self, expect: &Expectation) -> Vec<String> {
        let mut out = Vec::new();
        let mut check = |field: &str, expected: Option<String>, actual: Option<String>| {
            if let Some(expected) = expected {
                match actual {
                    Some(actual) if actual == expected => {}
                    Some(actual) => out.push(format!("{field}: expected {expected}, got {actual}")),
                    None => out.push(format!("{field}: not produced by this step")),
                }
            }
        };

        let view = match self {
            Self::View(view) => Some(view),
            _ => None,
        };
        let id = match self {
            Self::Submitted(id) => Some(id.get().to_string()),
            _ => None,
        };
        let users = match self {
            Self::Users(users) => Some(
                users
                    .iter()
                    .map(|u| u.as_str().to_string())
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        };
        let state = match self {
            Self::State { state, .. } => Some(state.as_str().to_string()),
            _ => None,
        };

        check("id", expect.id.map(|v| v.to_string()), id);
        check(
            "content_ref",
            expect.content_ref.clone(),
            view.map(|v| v.content_ref.clone()),
        );
        check(
            "has_access",
            expect.has_access.map(|v| v.to_string()),
            view.map(|v| v.has_access.to_string()),
        );
        check(
            "has_requested",
            expect.has_requested.map(|v| v.to_string()),
            view.map(|v| v.has_requested.to_string()),
        );
        check(
            "active",
            expect.active.map(|v| v.to_string()),
            view.map(|v| v.active.to_string()),
        );
        check("state", expect.state.clone(), state);

        // Element-wise: identities may themselves contain commas.
        if let Some(expected) = &expect.users {
            match users {
                Some(actual) if actual == *expected => {}
                Some(actual) => out.push(format!("users: expected {expected:?}, got {actual:?}")),
                None => out.push("users: not produced by this step".to_string()),
            }
        }
        out
    }
}

fn who(raw: &str) -> Result<Identity, StepError> {
    Ok(Identity::new(raw)?)
}

fn eid(raw: u64) -> Result<EvidenceId, StepError> {
    Ok(EvidenceId::new(raw)?)
}

fn execute(registry: &mut EvidenceRegistry, action: &Action) -> Result<Outcome, StepError> {
    let outcome = match action {
        Action::Submit {
            owner,
            content_ref,
            key_blob,
            description,
        } => Outcome::Submitted(registry.submit(
            &who(owner)?,
            Submission {
                content_ref: content_ref.clone(),
                key_blob: key_blob.clone(),
                description: description.clone(),
            },
        )?),
        Action::Request { id, user } => {
            registry.request_access(eid(*id)?, &who(user)?)?;
            Outcome::Done
        }
        Action::Grant { id, caller, user } => {
            registry.grant_access(eid(*id)?, &who(caller)?, &who(user)?)?;
            Outcome::Done
        }
        Action::Deny { id, caller, user } => {
            registry.deny_access(eid(*id)?, &who(caller)?, &who(user)?)?;
            Outcome::Done
        }
        Action::Revoke { id, caller, user } => {
            registry.revoke_access(eid(*id)?, &who(caller)?, &who(user)?)?;
            Outcome::Done
        }
        Action::SetActive { id, caller, active } => {
            registry.set_active(eid(*id)?, &who(caller)?, *active)?;
            Outcome::Done
        }
        Action::View { id, caller } => Outcome::View(registry.view(eid(*id)?, &who(caller)?)?),
        Action::Pending { id, caller } => {
            Outcome::Users(registry.list_pending(eid(*id)?, &who(caller)?)?)
        }
        Action::Granted { id, caller } => {
            Outcome::Users(registry.list_granted(eid(*id)?, &who(caller)?)?)
        }
        Action::Permission { id, caller, user } => {
            let id = eid(*id)?;
            let user = who(user)?;
            Outcome::State {
                has_permission: registry.has_permission(id, &user)?,
                state: registry.permission_state(id, &who(caller)?, &user)?,
            }
        }
    };
    Ok(outcome)
}

// ─── Report ─────────────────────────────────────────────────────────

/// Result of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: String,
    pub passed: bool,
    pub outcome: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<String>,
}

/// Result of a whole replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub steps: Vec<StepReport>,
    pub evidence_count: usize,
    pub audit: Vec<AuditEntry>,
    pub chain_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_error: Option<String>,
}

impl ReplayReport {
    /// Every step matched and the audit chain verifies.
    pub fn passed(&self) -> bool {
        self.chain_valid && self.steps.iter().all(|s| s.passed)
    }

    /// Number of steps that did not match.
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed).count()
    }
}

/// Run `scenario` against a fresh registry.
pub fn replay(scenario: &Scenario) -> ReplayReport {
    let audit = Arc::new(AuditLog::new());
    let sink = FanoutSink::new()
        .with(Arc::new(TracingSink))
        .with(audit.clone());
    let mut registry = EvidenceRegistry::with_sink(Arc::new(sink));

    let steps = scenario
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| run_step(&mut registry, index + 1, step))
        .collect();

    let chain = audit.verify_chain();
    ReplayReport {
        name: scenario.name.clone(),
        steps,
        evidence_count: registry.evidence_count(),
        audit: audit.entries(),
        chain_valid: chain.is_ok(),
        chain_error: chain.err().map(|e| e.to_string()),
    }
}

fn run_step(registry: &mut EvidenceRegistry, index: usize, step: &Step) -> StepReport {
    let action = step.action.describe();
    let result = execute(registry, &step.action);
    tracing::debug!(step = index, %action, ok = result.is_ok(), "step executed");

    let (passed, outcome, mismatches) = match (&step.expect_error, result) {
        (Some(expected), Err(err)) => {
            let passed = err.matches(expected);
            let mismatches = if passed {
                Vec::new()
            } else {
                vec![format!("expected error {expected}")]
            };
            (passed, format!("error: {err}"), mismatches)
        }
        (Some(expected), Ok(outcome)) => (
            false,
            outcome.summary(),
            vec![format!("expected error {expected}, but the step succeeded")],
        ),
        (None, Err(err)) => (false, format!("error: {err}"), vec!["unexpected error".into()]),
        (None, Ok(outcome)) => {
            let mismatches = step
                .expect
                .as_ref()
                .map(|e| outcome.mismatches(e))
                .unwrap_or_default();
            (mismatches.is_empty(), outcome.summary(), mismatches)
        }
    };

    StepReport {
        step: index,
        action,
        passed,
        outcome,
        mismatches,
    }
}

fn print_report(report: &ReplayReport) {
    if let Some(name) = &report.name {
        println!("scenario: {name}");
    }
    for step in &report.steps {
        let mark = if step.passed { "ok  " } else { "FAIL" };
        println!("[{mark}] {:>3} {} -> {}", step.step, step.action, step.outcome);
        for mismatch in &step.mismatches {
            println!("            {mismatch}");
        }
    }
    println!();
    println!("audit chain: {} entries", report.audit.len());
    for entry in &report.audit {
        println!(
            "  #{:<4} {:<14} {}",
            entry.sequence,
            entry.event.kind(),
            &entry.entry_hash[..16.min(entry.entry_hash.len())]
        );
    }
    match &report.chain_error {
        None => println!("audit chain verified"),
        Some(err) => println!("audit chain INVALID: {err}"),
    }
    println!(
        "{} steps, {} failed, {} records",
        report.steps.len(),
        report.failures(),
        report.evidence_count
    );
}

/// Execute `evreg replay`.
pub fn run_replay(args: &ReplayArgs) -> Result<u8> {
    let text = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("failed to read scenario {}", args.scenario.display()))?;
    let scenario: Scenario = serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse scenario {}", args.scenario.display()))?;

    let report = replay(&scenario);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.passed() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn parses_flattened_actions() {
        let scenario = parse(
            r#"
steps:
  - submit: { owner: alice, content_ref: Qm1 }
    expect: { id: 1 }
  - set_active: { id: 1, caller: alice, active: false }
  - request: { id: 1, user: bob }
    expect_error: not-found
"#,
        );
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(scenario.steps[0].action, Action::Submit { .. }));
        assert_eq!(scenario.steps[0].expect.as_ref().unwrap().id, Some(1));
        assert!(matches!(
            scenario.steps[1].action,
            Action::SetActive { active: false, .. }
        ));
        assert_eq!(scenario.steps[2].expect_error.as_deref(), Some("not-found"));
    }

    #[test]
    fn expected_error_by_kind_or_reason() {
        let report = replay(&parse(
            r#"
steps:
  - submit: { owner: alice, content_ref: Qm1 }
  - request: { id: 1, user: alice }
    expect_error: self-request
  - request: { id: 1, user: alice }
    expect_error: invalid-state
  - grant: { id: 1, caller: bob, user: carol }
    expect_error: unauthorized
  - view: { id: 9, caller: bob }
    expect_error: not-found
  - view: { id: 1, caller: "has space" }
    expect_error: validation
"#,
        ));
        assert!(report.passed(), "{report:#?}");
        assert_eq!(report.audit.len(), 1);
    }

    #[test]
    fn unexpected_success_fails_step() {
        let report = replay(&parse(
            r#"
steps:
  - submit: { owner: alice, content_ref: Qm1 }
  - request: { id: 1, user: bob }
    expect_error: already-pending
"#,
        ));
        assert!(!report.passed());
        assert_eq!(report.failures(), 1);
        assert!(report.steps[1].mismatches[0].contains("succeeded"));
    }

    #[test]
    fn wrong_error_fails_step() {
        let report = replay(&parse(
            r#"
steps:
  - submit: { owner: alice, content_ref: Qm1 }
  - grant: { id: 1, caller: alice, user: bob }
    expect_error: not-granted
"#,
        ));
        assert!(!report.steps[1].passed);
        assert!(report.steps[1].outcome.contains("not-pending"));
    }

    #[test]
    fn view_expectations_are_checked() {
        let report = replay(&parse(
            r#"
steps:
  - submit: { owner: alice, content_ref: Qm1, key_blob: k }
  - view: { id: 1, caller: bob }
    expect: { content_ref: Qm1 }
"#,
        ));
        assert!(!report.passed());
        assert_eq!(
            report.steps[1].mismatches,
            vec!["content_ref: expected Qm1, got ".to_string()]
        );
    }

    #[test]
    fn users_compare_element_wise() {
        let report = replay(&parse(
            r#"
steps:
  - submit: { owner: alice, content_ref: Qm1 }
  - request: { id: 1, user: "b,c" }
  - pending: { id: 1, caller: alice }
    expect: { users: [b, c] }
  - pending: { id: 1, caller: alice }
    expect: { users: ["b,c"] }
"#,
        ));
        assert!(!report.steps[2].passed);
        assert_eq!(
            report.steps[2].mismatches,
            vec![r#"users: expected ["b", "c"], got ["b,c"]"#.to_string()]
        );
        assert!(report.steps[3].passed);
    }

    #[test]
    fn expectation_on_wrong_step_kind_is_reported() {
        let report = replay(&parse(
            r#"
steps:
  - submit: { owner: alice, content_ref: Qm1 }
    expect: { users: [bob] }
"#,
        ));
        assert!(report.steps[0].mismatches[0].contains("not produced"));
    }

    #[test]
    fn permission_step_reports_state() {
        let report = replay(&parse(
            r#"
steps:
  - submit: { owner: alice, content_ref: Qm1 }
  - request: { id: 1, user: bob }
  - permission: { id: 1, caller: bob, user: bob }
    expect: { state: PENDING }
  - permission: { id: 1, caller: carol, user: bob }
    expect_error: unauthorized
"#,
        ));
        assert!(report.passed(), "{report:#?}");
    }
}
