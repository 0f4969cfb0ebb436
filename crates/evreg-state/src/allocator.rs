//! # Evidence ID Allocator
//!
//! Issues evidence identifiers. The single invariant: every issued id is
//! strictly greater than the one before it, starting at 1, and no id is ever
//! issued twice. Nothing else in the registry increments a counter.

use evreg_core::EvidenceId;

use crate::error::RegistryError;

/// Source of evidence identifiers.
pub trait IdAllocator: Send + Sync + std::fmt::Debug {
    /// Issue the next identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IdSpaceExhausted`] once the id space is used up.
    /// The allocator state is unchanged on error.
    fn next_id(&mut self) -> Result<EvidenceId, RegistryError>;

    /// The most recently issued identifier, if any.
    fn last_issued(&self) -> Option<EvidenceId>;
}

/// Single global counter starting at 1 with no gaps.
#[derive(Debug, Clone, Default)]
pub struct SequentialAllocator {
    last: u64,
    limit: Option<u64>,
}

impl SequentialAllocator {
    /// Create an allocator whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that refuses to issue ids above `limit`.
    pub fn with_limit(limit: u64) -> Self {
        Self {
            last: 0,
            limit: Some(limit),
        }
    }
}

impl IdAllocator for SequentialAllocator {
    fn next_id(&mut self) -> Result<EvidenceId, RegistryError> {
        let next = self
            .last
            .checked_add(1)
            .filter(|n| self.limit.map_or(true, |limit| *n <= limit))
            .ok_or(RegistryError::IdSpaceExhausted)?;
        let id = EvidenceId::new(next).map_err(|_| RegistryError::IdSpaceExhausted)?;
        self.last = next;
        Ok(id)
    }

    fn last_issued(&self) -> Option<EvidenceId> {
        EvidenceId::new(self.last).ok()
    }
}
