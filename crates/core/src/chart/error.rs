//! Chart of accounts error types.

use devalaya_shared::types::{GroupId, LedgerId};
use thiserror::Error;

use super::types::{AccountNature, LedgerType};

/// Errors that can occur while editing the chart of accounts.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Account group not found.
    #[error("Account group not found: {0}")]
    GroupNotFound(GroupId),

    /// Ledger not found.
    #[error("Ledger not found: {0}")]
    LedgerNotFound(LedgerId),

    /// Code already used by another group or ledger.
    #[error("Code already exists: {0}")]
    DuplicateCode(String),

    /// Nature differs from the owning or parent group.
    #[error("Nature mismatch: expected {expected}, got {actual}")]
    NatureMismatch {
        /// Nature of the parent or owning group.
        expected: AccountNature,
        /// Nature supplied for the child.
        actual: AccountNature,
    },

    /// Ledger type cannot live under a group of this nature.
    #[error("Ledger type {ledger_type} is not allowed under {nature} groups")]
    IncompatibleLedgerType {
        /// Requested ledger type.
        ledger_type: LedgerType,
        /// Nature of the owning group.
        nature: AccountNature,
    },

    /// Linking the parent would create a cycle.
    #[error("Moving group {group} under {parent} would create a cycle")]
    CycleDetected {
        /// The group being moved.
        group: GroupId,
        /// The requested parent.
        parent: GroupId,
    },

    /// Group still has child groups or ledgers.
    #[error("Account group {0} still has child groups or ledgers")]
    GroupNotEmpty(GroupId),

    /// Ledger is referenced and cannot be deleted.
    #[error("Ledger {ledger} is referenced by {references} record(s) and cannot be deleted")]
    ReferencedEntity {
        /// The ledger.
        ledger: LedgerId,
        /// Number of referencing entry lines, budgets, reconciliations, openings, and closing markers.
        references: u64,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ChartError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::LedgerNotFound(_) => "LEDGER_NOT_FOUND",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::NatureMismatch { .. } => "NATURE_MISMATCH",
            Self::IncompatibleLedgerType { .. } => "INCOMPATIBLE_LEDGER_TYPE",
            Self::CycleDetected { .. } => "CYCLE_DETECTED",
            Self::GroupNotEmpty(_) => "GROUP_NOT_EMPTY",
            Self::ReferencedEntity { .. } => "REFERENCED_ENTITY",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NatureMismatch { .. }
            | Self::IncompatibleLedgerType { .. }
            | Self::CycleDetected { .. } => 400,
            Self::GroupNotFound(_) | Self::LedgerNotFound(_) => 404,
            Self::DuplicateCode(_) | Self::GroupNotEmpty(_) | Self::ReferencedEntity { .. } => 409,
            Self::Database(_) => 500,
        }
    }
}
