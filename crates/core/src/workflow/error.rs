//! Workflow error types for the entry approval lifecycle.

use devalaya_shared::types::{AccountingYearId, ActorId, EntryId, LedgerId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::actor::Capability;
use crate::fiscal::YearStatus;
use crate::ledger::error::LedgerError;
use crate::workflow::types::EntryStatus;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Attempted an out-of-order status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: EntryStatus,
        /// The attempted target status.
        to: EntryStatus,
    },

    /// The actor lacks the capability for this transition.
    #[error("Actor {actor} lacks capability {capability}")]
    NotAuthorized {
        /// The actor.
        actor: ActorId,
        /// The missing capability.
        capability: Capability,
    },

    /// The entry's year no longer accepts changes.
    #[error("Accounting year {year_id} is {status}")]
    ClosedPeriod {
        /// The year.
        year_id: AccountingYearId,
        /// Its current status.
        status: YearStatus,
    },

    /// Cancel reason is required but not provided.
    #[error("Cancel reason is required")]
    CancelReasonRequired,

    /// Approval would breach a budget under the strict policy.
    #[error("Budget exceeded on ledger {ledger_id} by {overrun}")]
    BudgetOverrun {
        /// The expense ledger.
        ledger_id: LedgerId,
        /// Amount above the allocation.
        overrun: Decimal,
    },

    /// Entry not found.
    #[error("Entry {0} not found")]
    EntryNotFound(EntryId),

    /// Any other failure of the posting rules.
    #[error(transparent)]
    Ledger(LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::CancelReasonRequired => 400,
            Self::NotAuthorized { .. } => 403,
            Self::EntryNotFound(_) => 404,
            Self::InvalidTransition { .. } | Self::ClosedPeriod { .. } => 409,
            Self::BudgetOverrun { .. } => 422,
            Self::Ledger(err) => err.status_code(),
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::ClosedPeriod { .. } => "CLOSED_PERIOD",
            Self::CancelReasonRequired => "CANCEL_REASON_REQUIRED",
            Self::BudgetOverrun { .. } => "BUDGET_OVERRUN",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::Ledger(err) => err.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<LedgerError> for WorkflowError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::BudgetOverrun { ledger_id, overrun } => Self::BudgetOverrun { ledger_id, overrun },
            LedgerError::EntryNotFound(id) => Self::EntryNotFound(id),
            LedgerError::ClosedPeriod { year_id, status } => Self::ClosedPeriod { year_id, status },
            LedgerError::Database(msg) => Self::Database(msg),
            other => Self::Ledger(other),
        }
    }
}
