//! Budget data types.

use devalaya_shared::types::{AccountingYearId, BudgetId, LedgerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::variance::BudgetVariance;

/// Budget lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    /// Being prepared, editable.
    Draft,
    /// Waiting for approval.
    Submitted,
    /// Authoritative allocation used by the guard.
    Approved,
    /// Retired; no longer enforced.
    Closed,
}

impl BudgetStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Closed => "CLOSED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "SUBMITTED" => Some(Self::Submitted),
            "APPROVED" => Some(Self::Approved),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A budget lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetAction {
    /// DRAFT → SUBMITTED.
    Submit,
    /// SUBMITTED → DRAFT.
    Return,
    /// SUBMITTED → APPROVED.
    Approve,
    /// APPROVED → CLOSED.
    Close,
}

impl BudgetAction {
    /// Status required before the action.
    #[must_use]
    pub fn required_status(self) -> BudgetStatus {
        match self {
            Self::Submit => BudgetStatus::Draft,
            Self::Return | Self::Approve => BudgetStatus::Submitted,
            Self::Close => BudgetStatus::Approved,
        }
    }

    /// Status after the action.
    #[must_use]
    pub fn new_status(self) -> BudgetStatus {
        match self {
            Self::Submit => BudgetStatus::Submitted,
            Self::Return => BudgetStatus::Draft,
            Self::Approve => BudgetStatus::Approved,
            Self::Close => BudgetStatus::Closed,
        }
    }
}

/// A budget allocation for one ledger in one accounting year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Budget ID.
    pub id: BudgetId,
    /// Budgeted ledger.
    pub ledger_id: LedgerId,
    /// Accounting year.
    pub year_id: AccountingYearId,
    /// Allocated amount.
    pub allocated: Decimal,
    /// Lifecycle status.
    pub status: BudgetStatus,
    /// Optional notes.
    pub notes: Option<String>,
}

/// Input for creating a budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBudgetInput {
    /// Budgeted ledger.
    pub ledger_id: LedgerId,
    /// Accounting year.
    pub year_id: AccountingYearId,
    /// Allocated amount.
    pub allocated: Decimal,
    /// Optional notes.
    pub notes: Option<String>,
}

/// What the store knows about a ledger's budget for a year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetPosition {
    /// Allocation of the APPROVED budget, if any.
    pub allocated: Option<Decimal>,
    /// Cumulative approved debit spend.
    pub spent: Decimal,
}

/// Result of a budget check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetCheck {
    /// The expense ledger.
    pub ledger_id: LedgerId,
    /// Allocation, absent when no budget is approved.
    pub allocated: Option<Decimal>,
    /// Approved spend before the candidate.
    pub spent: Decimal,
    /// Candidate debit amount.
    pub candidate: Decimal,
    /// Whether spent + candidate stays within the allocation.
    pub within_budget: bool,
    /// Amount above the allocation, zero when within budget.
    pub overrun: Decimal,
}

impl BudgetCheck {
    /// Converts a breach into a warning.
    #[must_use]
    pub fn warning(&self) -> Option<BudgetOverrunWarning> {
        if self.within_budget {
            return None;
        }
        Some(BudgetOverrunWarning {
            ledger_id: self.ledger_id,
            allocated: self.allocated.unwrap_or(Decimal::ZERO),
            spent: self.spent,
            candidate: self.candidate,
            overrun: self.overrun,
        })
    }
}

/// A non-fatal budget breach returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetOverrunWarning {
    /// The expense ledger.
    pub ledger_id: LedgerId,
    /// Approved allocation.
    pub allocated: Decimal,
    /// Approved spend before this entry.
    pub spent: Decimal,
    /// This entry's debit on the ledger.
    pub candidate: Decimal,
    /// Amount above the allocation.
    pub overrun: Decimal,
}

/// One row of the budget-vs-actual report.
#[derive(Debug, Clone, Serialize)]
pub struct VarianceLine {
    /// Budget ID.
    pub budget_id: BudgetId,
    /// Ledger ID.
    pub ledger_id: LedgerId,
    /// Ledger code.
    pub ledger_code: String,
    /// Ledger name.
    pub ledger_name: String,
    /// Budget status.
    pub status: BudgetStatus,
    /// Variance figures.
    pub variance: BudgetVariance,
}

/// Budget-vs-actual report for one accounting year.
#[derive(Debug, Clone, Serialize)]
pub struct VarianceReport {
    /// Accounting year.
    pub year_id: AccountingYearId,
    /// Rows ordered by ledger code.
    pub lines: Vec<VarianceLine>,
    /// Sum of allocations.
    pub total_budgeted: Decimal,
    /// Sum of actuals.
    pub total_actual: Decimal,
}
