//! Budget lifecycle rules and the budget-vs-actual report.

use devalaya_shared::types::{AccountingYearId, BudgetId};
use rust_decimal::Decimal;

use super::error::BudgetError;
use super::types::{Budget, BudgetAction, BudgetStatus, VarianceLine, VarianceReport};
use super::variance::BudgetVariance;
use crate::chart::types::{AccountNature, Ledger};

/// Budget service for business logic.
pub struct BudgetService;

impl BudgetService {
    /// Validates a new or edited allocation.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::NegativeAmount` for a negative allocation and
    /// `BudgetError::NotBudgetable` for ledgers outside INCOME and EXPENSE.
    pub fn validate_allocation(ledger: &Ledger, allocated: Decimal) -> Result<(), BudgetError> {
        if allocated < Decimal::ZERO {
            return Err(BudgetError::NegativeAmount);
        }

        if !matches!(ledger.nature, AccountNature::Income | AccountNature::Expense) {
            return Err(BudgetError::NotBudgetable {
                ledger_id: ledger.id,
                nature: ledger.nature,
            });
        }

        Ok(())
    }

    /// Only drafts may be edited or deleted.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::NotEditable` for any other status.
    pub fn ensure_editable(status: BudgetStatus) -> Result<(), BudgetError> {
        if status == BudgetStatus::Draft {
            Ok(())
        } else {
            Err(BudgetError::NotEditable(status))
        }
    }

    /// Applies a lifecycle action.
    ///
    /// `approved_sibling` is the APPROVED budget already present for the same
    /// ledger and year, if any.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidTransition` when the action does not apply
    /// to the current status, and `BudgetError::AlreadyApproved` when approving
    /// would leave two approved budgets.
    pub fn transition(
        budget: &Budget,
        action: BudgetAction,
        approved_sibling: Option<BudgetId>,
    ) -> Result<BudgetStatus, BudgetError> {
        if budget.status != action.required_status() {
            return Err(BudgetError::InvalidTransition {
                from: budget.status,
                to: action.new_status(),
            });
        }

        if action == BudgetAction::Approve {
            if let Some(existing) = approved_sibling.filter(|id| *id != budget.id) {
                return Err(BudgetError::AlreadyApproved { existing });
            }
        }

        Ok(action.new_status())
    }

    /// Builds the budget-vs-actual report.
    ///
    /// `rows` pairs every budget with its ledger and the ledger's approved
    /// activity for the year (debits for expenses, credits for income).
    #[must_use]
    pub fn variance_report(year_id: AccountingYearId, rows: &[(Budget, Ledger, Decimal)]) -> VarianceReport {
        let mut lines: Vec<VarianceLine> = rows
            .iter()
            .map(|(budget, ledger, actual)| VarianceLine {
                budget_id: budget.id,
                ledger_id: ledger.id,
                ledger_code: ledger.code.clone(),
                ledger_name: ledger.name.clone(),
                status: budget.status,
                variance: BudgetVariance::for_nature(ledger.nature, budget.allocated, *actual),
            })
            .collect();
        lines.sort_by(|a, b| a.ledger_code.cmp(&b.ledger_code));

        VarianceReport {
            year_id,
            total_budgeted: lines.iter().map(|l| l.variance.budget_amount).sum(),
            total_actual: lines.iter().map(|l| l.variance.actual_amount).sum(),
            lines,
        }
    }
}
