//! Budget overrun checks at posting and approval time.

use devalaya_shared::BudgetPolicy;
use devalaya_shared::types::LedgerId;
use rust_decimal::Decimal;

use super::types::{BudgetCheck, BudgetOverrunWarning, BudgetPosition};
use crate::ledger::error::LedgerError;

/// Stateless budget guard.
pub struct BudgetGuard;

impl BudgetGuard {
    /// Compares approved spend plus the candidate against the approved allocation.
    ///
    /// A ledger without an approved budget is always within budget. Reaching
    /// the allocation exactly is not an overrun.
    #[must_use]
    pub fn check(ledger_id: LedgerId, position: BudgetPosition, candidate: Decimal) -> BudgetCheck {
        let projected = position.spent + candidate;
        let overrun = match position.allocated {
            Some(allocated) if projected > allocated => projected - allocated,
            _ => Decimal::ZERO,
        };

        BudgetCheck {
            ledger_id,
            allocated: position.allocated,
            spent: position.spent,
            candidate,
            within_budget: overrun.is_zero(),
            overrun,
        }
    }

    /// Applies the overrun policy to a check.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::BudgetOverrun` for a breach under the strict policy.
    pub fn enforce(check: &BudgetCheck, policy: BudgetPolicy) -> Result<Option<BudgetOverrunWarning>, LedgerError> {
        match check.warning() {
            Some(warning) if policy.is_strict() => Err(LedgerError::BudgetOverrun {
                ledger_id: warning.ledger_id,
                overrun: warning.overrun,
            }),
            other => Ok(other),
        }
    }
}
