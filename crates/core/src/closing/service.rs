//! Year-end closing rules.
//!
//! Validation is a pure checklist. Execution is split into steps the store
//! drives: `begin` (OPEN or CLOSING → CLOSING), `plan` (closing figures for
//! every ledger), `pending` (figures not yet written by an earlier run), and
//! `finish` (CLOSING → CLOSED).

use std::collections::HashSet;

use devalaya_shared::types::{AccountingYearId, LedgerId};
use rayon::prelude::*;
use rust_decimal::Decimal;

use super::error::ClosingError;
use super::types::{ClosingFacts, ClosingIssue, ClosingPlan, ClosingValidation, LedgerClosing, LedgerClosingFigure};
use crate::actor::{Actor, Capability};
use crate::chart::types::{AccountNature, Ledger};
use crate::fiscal::{FiscalError, YearService, YearStatus};
use crate::ledger::balance::BalanceSnapshot;

/// Stateless year-end closing service.
pub struct ClosingService;

impl ClosingService {
    /// Runs the closing checklist. Never mutates anything.
    ///
    /// One check each for the year status, pending entries and the next year,
    /// plus one per bank or cash ledger.
    #[must_use]
    pub fn validate(facts: &ClosingFacts) -> ClosingValidation {
        let mut issues = Vec::new();
        let mut checks_total: u32 = 3;

        if facts.year_status != YearStatus::Open {
            issues.push(ClosingIssue::YearNotOpen {
                status: facts.year_status,
            });
        }

        if facts.pending_entries > 0 {
            issues.push(ClosingIssue::PendingEntries {
                count: facts.pending_entries,
            });
        }

        let reconciled: HashSet<LedgerId> = facts.reconciled_ledgers.iter().copied().collect();
        for (ledger_id, code) in &facts.bank_ledgers {
            checks_total += 1;
            if !reconciled.contains(ledger_id) {
                issues.push(ClosingIssue::UnreconciledBankLedger {
                    ledger_id: *ledger_id,
                    code: code.clone(),
                });
            }
        }

        if facts.next_year_id.is_none() {
            issues.push(ClosingIssue::NextYearMissing);
        }

        let failed = u32::try_from(issues.len()).unwrap_or(checks_total);
        ClosingValidation {
            year_id: facts.year_id,
            issues,
            checks_total,
            checks_passed: checks_total.saturating_sub(failed),
        }
    }

    /// Percentage of passed checklist items, rounded down.
    #[must_use]
    pub fn progress(validation: &ClosingValidation) -> u8 {
        if validation.checks_total == 0 {
            return 100;
        }
        let percent = validation.checks_passed.saturating_mul(100) / validation.checks_total;
        u8::try_from(percent).unwrap_or(100)
    }

    /// Requires `can_close_year`.
    ///
    /// # Errors
    ///
    /// Returns `ClosingError::NotAuthorized`.
    pub fn authorize(actor: &Actor) -> Result<(), ClosingError> {
        if actor.has(Capability::CloseYear) {
            Ok(())
        } else {
            Err(ClosingError::NotAuthorized {
                actor: actor.id,
                capability: Capability::CloseYear,
            })
        }
    }

    /// Starts or resumes execution.
    ///
    /// A CLOSING year resumes an interrupted run; its own status is not an
    /// issue then.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for a CLOSED year and `Blocked` when the
    /// checklist has issues.
    pub fn begin(current: YearStatus, validation: &ClosingValidation) -> Result<YearStatus, ClosingError> {
        let next = YearService::begin_closing(current).map_err(transition_error)?;

        let issues: Vec<ClosingIssue> = validation
            .issues
            .iter()
            .filter(|issue| {
                !(current == YearStatus::Closing
                    && matches!(issue, ClosingIssue::YearNotOpen { status: YearStatus::Closing }))
            })
            .cloned()
            .collect();
        if !issues.is_empty() {
            return Err(ClosingError::Blocked { issues });
        }

        Ok(next)
    }

    /// The surplus ledger must be an active EQUITY ledger.
    ///
    /// # Errors
    ///
    /// Returns `ClosingError::SurplusLedgerInvalid`.
    pub fn check_surplus_ledger(ledger: &Ledger) -> Result<(), ClosingError> {
        if ledger.nature == AccountNature::Equity && ledger.is_active {
            Ok(())
        } else {
            Err(ClosingError::SurplusLedgerInvalid(ledger.id))
        }
    }

    /// Computes the closing figure of every ledger.
    ///
    /// Without a surplus ledger every balance carries forward unchanged. With
    /// one, INCOME and EXPENSE ledgers carry nothing and their net (income
    /// minus expense) is added to the surplus ledger's opening.
    ///
    /// # Errors
    ///
    /// Returns `SurplusLedgerInvalid` unless the surplus ledger is an active
    /// EQUITY ledger.
    pub fn plan(
        year_id: AccountingYearId,
        next_year_id: AccountingYearId,
        balances: &[(Ledger, BalanceSnapshot)],
        surplus_ledger: Option<&Ledger>,
    ) -> Result<ClosingPlan, ClosingError> {
        if let Some(ledger) = surplus_ledger {
            Self::check_surplus_ledger(ledger)?;
        }
        let closes_nominal = surplus_ledger.is_some();

        let mut figures: Vec<LedgerClosingFigure> = balances
            .par_iter()
            .map(|(ledger, snapshot)| LedgerClosingFigure {
                ledger_id: ledger.id,
                nature: ledger.nature,
                closing_balance: snapshot.closing,
                carried_forward: if closes_nominal && ledger.nature.is_nominal() {
                    Decimal::ZERO
                } else {
                    snapshot.closing
                },
            })
            .collect();

        let surplus: Decimal = figures
            .par_iter()
            .map(|f| match f.nature {
                AccountNature::Income => f.closing_balance,
                AccountNature::Expense => -f.closing_balance,
                _ => Decimal::ZERO,
            })
            .sum();

        if let Some(target) = surplus_ledger {
            match figures.iter_mut().find(|f| f.ledger_id == target.id) {
                Some(figure) => figure.carried_forward += surplus,
                None => figures.push(LedgerClosingFigure {
                    ledger_id: target.id,
                    nature: target.nature,
                    closing_balance: Decimal::ZERO,
                    carried_forward: surplus,
                }),
            }
        }

        Ok(ClosingPlan {
            year_id,
            next_year_id,
            figures,
            surplus,
            surplus_ledger_id: surplus_ledger.map(|l| l.id),
        })
    }

    /// Figures not yet written by an earlier run.
    #[must_use]
    pub fn pending<'a>(plan: &'a ClosingPlan, already_closed: &HashSet<LedgerId>) -> Vec<&'a LedgerClosingFigure> {
        plan.figures
            .iter()
            .filter(|f| !already_closed.contains(&f.ledger_id))
            .collect()
    }

    /// The stored marker for one figure.
    #[must_use]
    pub fn closing_record(plan: &ClosingPlan, figure: &LedgerClosingFigure) -> LedgerClosing {
        LedgerClosing {
            year_id: plan.year_id,
            ledger_id: figure.ledger_id,
            closing_balance: figure.closing_balance,
            carried_forward: figure.carried_forward,
            next_year_id: plan.next_year_id,
        }
    }

    /// Completes execution.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the year is CLOSING.
    pub fn finish(current: YearStatus) -> Result<YearStatus, ClosingError> {
        YearService::finish_closing(current).map_err(transition_error)
    }
}

fn transition_error(err: FiscalError) -> ClosingError {
    match err {
        FiscalError::InvalidTransition { from, to } => ClosingError::InvalidTransition { from, to },
        FiscalError::YearNotFound(id) => ClosingError::YearNotFound(id),
        other => ClosingError::Database(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devalaya_shared::types::{ActorId, GroupId};
    use rust_decimal_macros::dec;

    use crate::chart::types::LedgerType;
    use crate::ledger::balance::BalanceEngine;

    fn ledger(code: &str, ledger_type: LedgerType, nature: AccountNature) -> Ledger {
        Ledger {
            id: LedgerId::new(),
            code: code.to_string(),
            name: code.to_string(),
            group_id: GroupId::new(),
            ledger_type,
            nature,
            opening_balance: Decimal::ZERO,
            opening_year_id: None,
            is_active: true,
        }
    }

    fn facts() -> ClosingFacts {
        ClosingFacts {
            year_id: AccountingYearId::new(),
            year_status: YearStatus::Open,
            pending_entries: 0,
            bank_ledgers: Vec::new(),
            reconciled_ledgers: Vec::new(),
            next_year_id: Some(AccountingYearId::new()),
        }
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let bank = LedgerId::new();
        let mut f = facts();
        f.pending_entries = 3;
        f.bank_ledgers = vec![(bank, "1100".to_string())];
        f.next_year_id = None;

        let v = ClosingService::validate(&f);
        let codes: Vec<&str> = v.issues.iter().map(ClosingIssue::code).collect();
        assert_eq!(codes, vec!["PENDING_ENTRIES", "UNRECONCILED_BANK_LEDGER", "NEXT_YEAR_MISSING"]);
        assert_eq!(v.checks_total, 4);
        assert_eq!(v.checks_passed, 1);
        assert_eq!(ClosingService::progress(&v), 25);

        f.pending_entries = 0;
        f.reconciled_ledgers = vec![bank];
        f.next_year_id = Some(AccountingYearId::new());
        let ready = ClosingService::validate(&f);
        assert!(ready.is_ready());
        assert_eq!(ClosingService::progress(&ready), 100);
    }

    #[test]
    fn test_begin_and_finish() {
        let ready = ClosingService::validate(&facts());
        assert_eq!(ClosingService::begin(YearStatus::Open, &ready).unwrap(), YearStatus::Closing);

        let mut resumed = facts();
        resumed.year_status = YearStatus::Closing;
        let v = ClosingService::validate(&resumed);
        assert!(!v.is_ready());
        assert_eq!(ClosingService::begin(YearStatus::Closing, &v).unwrap(), YearStatus::Closing);

        assert!(matches!(
            ClosingService::begin(YearStatus::Closed, &ready),
            Err(ClosingError::InvalidTransition {
                from: YearStatus::Closed,
                ..
            })
        ));

        let mut blocked = facts();
        blocked.pending_entries = 1;
        assert!(matches!(
            ClosingService::begin(YearStatus::Open, &ClosingService::validate(&blocked)),
            Err(ClosingError::Blocked { .. })
        ));

        assert_eq!(ClosingService::finish(YearStatus::Closing).unwrap(), YearStatus::Closed);
        assert!(ClosingService::finish(YearStatus::Closed).is_err());
    }

    #[test]
    fn test_authorize() {
        assert!(ClosingService::authorize(&Actor::accountant(ActorId::new())).is_ok());
        assert!(matches!(
            ClosingService::authorize(&Actor::clerk(ActorId::new())),
            Err(ClosingError::NotAuthorized { .. })
        ));
    }

    fn sample_balances() -> Vec<(Ledger, BalanceSnapshot)> {
        let bank = ledger("1100", LedgerType::Bank, AccountNature::Asset);
        let donations = ledger("4100", LedgerType::Income, AccountNature::Income);
        let electricity = ledger("5100", LedgerType::Expense, AccountNature::Expense);
        vec![
            (bank, BalanceEngine::snapshot(AccountNature::Asset, dec!(1000), dec!(5000), dec!(1200))),
            (donations, BalanceEngine::snapshot(AccountNature::Income, Decimal::ZERO, Decimal::ZERO, dec!(5000))),
            (electricity, BalanceEngine::snapshot(AccountNature::Expense, Decimal::ZERO, dec!(1200), Decimal::ZERO)),
        ]
    }

    #[test]
    fn test_plan_carries_everything_without_surplus_ledger() {
        let balances = sample_balances();
        let plan = ClosingService::plan(AccountingYearId::new(), AccountingYearId::new(), &balances, None).unwrap();

        assert_eq!(plan.figures.len(), 3);
        assert_eq!(plan.figures[0].closing_balance, dec!(4800));
        assert!(plan.figures.iter().all(|f| f.carried_forward == f.closing_balance));
        assert_eq!(plan.surplus, dec!(3800));
    }

    #[test]
    fn test_plan_moves_surplus_into_equity() {
        let balances = sample_balances();
        let fund = ledger("3100", LedgerType::Normal, AccountNature::Equity);
        let plan =
            ClosingService::plan(AccountingYearId::new(), AccountingYearId::new(), &balances, Some(&fund)).unwrap();

        assert_eq!(plan.figures[1].carried_forward, Decimal::ZERO);
        assert_eq!(plan.figures[2].carried_forward, Decimal::ZERO);
        let fund_figure = plan.figures.iter().find(|f| f.ledger_id == fund.id).unwrap();
        assert_eq!(fund_figure.carried_forward, dec!(3800));

        let bank = balances[0].0.clone();
        assert!(matches!(
            ClosingService::plan(AccountingYearId::new(), AccountingYearId::new(), &balances, Some(&bank)),
            Err(ClosingError::SurplusLedgerInvalid(_))
        ));
    }

    #[test]
    fn test_pending_skips_closed_ledgers() {
        let balances = sample_balances();
        let plan = ClosingService::plan(AccountingYearId::new(), AccountingYearId::new(), &balances, None).unwrap();
        let closed: HashSet<LedgerId> = [plan.figures[0].ledger_id].into_iter().collect();

        let pending = ClosingService::pending(&plan, &closed);
        assert_eq!(pending.len(), 2);
        let record = ClosingService::closing_record(&plan, pending[0]);
        assert_eq!(record.next_year_id, plan.next_year_id);
    }
}
