//! Year-end closing error types.

use devalaya_shared::types::{AccountingYearId, ActorId, LedgerId};
use thiserror::Error;

use super::types::ClosingIssue;
use crate::actor::Capability;
use crate::fiscal::YearStatus;

/// Errors that can occur during year-end closing.
#[derive(Debug, Error)]
pub enum ClosingError {
    /// Validation found blocking issues.
    #[error("Accounting year cannot be closed: {} blocking issue(s)", issues.len())]
    Blocked {
        /// The issues.
        issues: Vec<ClosingIssue>,
    },

    /// Out-of-order year transition, e.g. closing a CLOSED year.
    #[error("Invalid accounting year transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: YearStatus,
        /// Requested status.
        to: YearStatus,
    },

    /// The actor lacks `can_close_year`.
    #[error("Actor {actor} lacks capability {capability}")]
    NotAuthorized {
        /// The actor.
        actor: ActorId,
        /// The missing capability.
        capability: Capability,
    },

    /// The surplus ledger is missing or not an EQUITY ledger.
    #[error("Ledger {0} cannot receive the year's surplus")]
    SurplusLedgerInvalid(LedgerId),

    /// Accounting year not found.
    #[error("Accounting year not found: {0}")]
    YearNotFound(AccountingYearId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ClosingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Blocked { .. } => "CLOSING_BLOCKED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::SurplusLedgerInvalid(_) => "SURPLUS_LEDGER_INVALID",
            Self::YearNotFound(_) => "YEAR_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SurplusLedgerInvalid(_) => 400,
            Self::NotAuthorized { .. } => 403,
            Self::YearNotFound(_) => 404,
            Self::InvalidTransition { .. } => 409,
            Self::Blocked { .. } => 422,
            Self::Database(_) => 500,
        }
    }
}
