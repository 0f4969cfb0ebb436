//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the two identifier namespaces of the
//! registry. An [`Identity`] names an actor (owner, requester, grantee); an
//! [`EvidenceId`] names an evidence record. They are distinct types so that
//! an actor can never be passed where a record is expected.
//!
//! ## Validation
//!
//! [`Identity`] is opaque. The registry only compares identities for
//! equality, but they are still checked at construction: non-empty, bounded
//! length, free of whitespace or control characters. Deserialization
//! routes through the same check. [`EvidenceId`] values are issued by the
//! allocator in `evreg-state` and start at 1.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of an identity string, in bytes.
pub const MAX_IDENTITY_LEN: usize = 256;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// An opaque, equality-comparable actor identifier.
///
/// Typically a wallet address, DID, or account handle supplied by the
/// authentication provider. The registry attaches no meaning to its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Create an identity from a string, validating format.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the trimmed value is empty, longer than
    /// [`MAX_IDENTITY_LEN`] bytes, or contains whitespace/control characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyIdentity);
        }
        if trimmed.len() > MAX_IDENTITY_LEN {
            return Err(ValidationError::IdentityTooLong {
                len: trimmed.len(),
                max: MAX_IDENTITY_LEN,
            });
        }
        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ValidationError::IdentityCharacters(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// EvidenceId
// ---------------------------------------------------------------------------

/// Identifier of an evidence record.
///
/// Issued once by the registry's allocator, strictly increasing from 1,
/// never reused. Serializes as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceId(u64);

impl EvidenceId {
    /// Wrap a raw value. Zero is never issued, so it is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEvidenceId`] for zero.
    pub fn new(value: u64) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::InvalidEvidenceId(value.to_string()));
        }
        Ok(Self(value))
    }

    /// The raw integer value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EvidenceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidEvidenceId(s.to_string()))?;
        Self::new(value)
    }
}
