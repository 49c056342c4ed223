//! Budget variance calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::chart::types::AccountNature;

/// Type of variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceType {
    /// Under budget for expenses, above target for income.
    Favorable,
    /// Over budget for expenses, below target for income.
    Unfavorable,
    /// No variance.
    None,
}

/// Budget vs actual variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetVariance {
    /// Budgeted amount.
    pub budget_amount: Decimal,
    /// Actual amount.
    pub actual_amount: Decimal,
    /// Signed variance, positive when favorable.
    pub variance_amount: Decimal,
    /// Variance as a percentage of the budget, two decimal places.
    pub variance_percentage: Decimal,
    /// Actual as a percentage of the budget, two decimal places.
    pub utilization_percentage: Decimal,
    /// Type of variance.
    pub variance_type: VarianceType,
}

impl BudgetVariance {
    /// Calculates variance for an expense ledger.
    ///
    /// For expenses: under budget is favorable, over budget is unfavorable.
    #[must_use]
    pub fn for_expense(budget: Decimal, actual: Decimal) -> Self {
        Self::build(budget, actual, budget - actual)
    }

    /// Calculates variance for an income ledger.
    ///
    /// For income: over target is favorable, under target is unfavorable.
    #[must_use]
    pub fn for_income(budget: Decimal, actual: Decimal) -> Self {
        Self::build(budget, actual, actual - budget)
    }

    /// Picks the expense or income rule from the ledger nature.
    #[must_use]
    pub fn for_nature(nature: AccountNature, budget: Decimal, actual: Decimal) -> Self {
        match nature {
            AccountNature::Income => Self::for_income(budget, actual),
            _ => Self::for_expense(budget, actual),
        }
    }

    fn build(budget: Decimal, actual: Decimal, variance: Decimal) -> Self {
        let percent_of_budget = |value: Decimal| {
            if budget.is_zero() {
                Decimal::ZERO
            } else {
                (value / budget * Decimal::ONE_HUNDRED).round_dp(2)
            }
        };

        let variance_type = if variance.is_zero() {
            VarianceType::None
        } else if variance.is_sign_positive() {
            VarianceType::Favorable
        } else {
            VarianceType::Unfavorable
        };

        Self {
            budget_amount: budget,
            actual_amount: actual,
            variance_amount: variance,
            variance_percentage: percent_of_budget(variance),
            utilization_percentage: percent_of_budget(actual),
            variance_type,
        }
    }
}
