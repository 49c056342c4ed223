//! Budget error types.

use devalaya_shared::types::{AccountingYearId, BudgetId, LedgerId};
use thiserror::Error;

use super::types::BudgetStatus;
use crate::chart::types::AccountNature;

/// Budget-related errors.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Budget not found.
    #[error("Budget not found: {0}")]
    NotFound(BudgetId),

    /// Ledger not found.
    #[error("Ledger not found: {0}")]
    LedgerNotFound(LedgerId),

    /// Accounting year not found.
    #[error("Accounting year not found: {0}")]
    YearNotFound(AccountingYearId),

    /// Only income and expense ledgers carry budgets.
    #[error("Ledger {ledger_id} has nature {nature}; only INCOME and EXPENSE ledgers can be budgeted")]
    NotBudgetable {
        /// The ledger.
        ledger_id: LedgerId,
        /// Its nature.
        nature: AccountNature,
    },

    /// Amount cannot be negative.
    #[error("Amount cannot be negative")]
    NegativeAmount,

    /// Only draft budgets can be edited or deleted.
    #[error("Budget is {0}; only DRAFT budgets can be modified")]
    NotEditable(BudgetStatus),

    /// Invalid lifecycle transition.
    #[error("Invalid budget transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: BudgetStatus,
        /// Requested status.
        to: BudgetStatus,
    },

    /// Another budget is already approved for the ledger and year.
    #[error("Budget {existing} is already approved for this ledger and year")]
    AlreadyApproved {
        /// The approved budget.
        existing: BudgetId,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl BudgetError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "BUDGET_NOT_FOUND",
            Self::LedgerNotFound(_) => "LEDGER_NOT_FOUND",
            Self::YearNotFound(_) => "YEAR_NOT_FOUND",
            Self::NotBudgetable { .. } => "NOT_BUDGETABLE",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::NotEditable(_) => "BUDGET_NOT_EDITABLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyApproved { .. } => "BUDGET_ALREADY_APPROVED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotBudgetable { .. } | Self::NegativeAmount => 400,
            Self::NotFound(_) | Self::LedgerNotFound(_) | Self::YearNotFound(_) => 404,
            Self::NotEditable(_) | Self::InvalidTransition { .. } | Self::AlreadyApproved { .. } => 409,
            Self::Database(_) => 500,
        }
    }
}
