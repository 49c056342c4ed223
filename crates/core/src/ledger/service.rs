//! Entry service: the posting validation pipeline.
//!
//! Pure business logic with no database dependencies. The repository loads
//! the year, the ledgers, the reconciliation locks and budget positions, then
//! hands them to [`EntryService::validate`] inside its transaction.

use chrono::NaiveDate;
use devalaya_shared::BudgetPolicy;
use devalaya_shared::types::{AccountingYearId, LedgerId};
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::kinds::{KindContext, validate_kind};
use super::types::{EntryLine, LockedPeriod, PostEntryInput, ResolvedLine, Side, ValidatedEntry};
use super::validation::{line_side, validate_lines};
use crate::budget::guard::BudgetGuard;
use crate::budget::types::{BudgetOverrunWarning, BudgetPosition};
use crate::chart::types::{AccountNature, Ledger, LedgerType};
use crate::fiscal::AccountingYear;
use crate::workflow::types::EntryStatus;

/// Reference data a posting is validated against.
#[derive(Debug, Clone, Copy)]
pub struct PostingContext<'a> {
    /// Target accounting year.
    pub year: &'a AccountingYear,
    /// Reconciliation-locked bank periods.
    pub locked_periods: &'a [LockedPeriod],
    /// Budget overrun policy.
    pub budget_policy: BudgetPolicy,
}

/// Entry service for posting validation.
pub struct EntryService;

impl EntryService {
    /// Validates an entry before it is persisted.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// 1. The year must be OPEN and contain the entry date
    /// 2. At least two lines, each with exactly one positive side
    /// 3. Σdebit == Σcredit, exact
    /// 4. Every ledger exists, is active, and is not locked by reconciliation
    /// 5. The kind's ledger rules
    /// 6. Budget checks on expense debits
    ///
    /// # Errors
    ///
    /// Returns the `LedgerError` of the first failing check.
    pub fn validate<'l, L, B>(
        input: &PostEntryInput,
        ctx: &PostingContext<'_>,
        ledger_lookup: L,
        budget_lookup: B,
    ) -> Result<ValidatedEntry, LedgerError>
    where
        L: Fn(LedgerId) -> Option<&'l Ledger>,
        B: Fn(LedgerId) -> BudgetPosition,
    {
        Self::validate_year(input, ctx.year)?;

        let totals = validate_lines(&input.lines)?;

        let mut lines = Vec::with_capacity(input.lines.len());
        for (line_no, line) in (1u32..).zip(&input.lines) {
            let ledger = ledger_lookup(line.ledger_id).ok_or(LedgerError::LedgerNotFound(line.ledger_id))?;
            if !ledger.is_active {
                return Err(LedgerError::LedgerInactive(ledger.id));
            }
            Self::ensure_unlocked([ledger.id], input.entry_date, ctx.locked_periods)?;

            let (side, amount) = line_side(line_no, line)?;
            lines.push(ResolvedLine {
                line_no,
                ledger_id: ledger.id,
                ledger_type: ledger.ledger_type,
                nature: ledger.nature,
                side,
                amount,
                narration: line.narration.clone(),
                cost_center: line.cost_center.clone(),
                reference_number: line.reference_number.clone(),
            });
        }

        validate_kind(&KindContext { input, lines: &lines })?;

        let debits = Self::expense_debits(&lines);
        let budget_warnings = Self::check_budgets(&debits, ctx.budget_policy, budget_lookup)?;

        Ok(ValidatedEntry {
            lines,
            totals,
            budget_warnings,
        })
    }

    /// Rejects a change touching any of `ledger_ids` on `date` inside a
    /// reconciliation-locked period.
    ///
    /// Applies to new postings and to every later status change (approval,
    /// cancellation, amendment) of an entry dated inside the lock.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::PeriodLocked` naming the first locked ledger.
    pub fn ensure_unlocked(
        ledger_ids: impl IntoIterator<Item = LedgerId>,
        date: NaiveDate,
        locked: &[LockedPeriod],
    ) -> Result<(), LedgerError> {
        for ledger_id in ledger_ids {
            if locked.iter().any(|p| p.covers(ledger_id, date)) {
                return Err(LedgerError::PeriodLocked { ledger_id, date });
            }
        }
        Ok(())
    }

    /// Rejects postings into a year that is not OPEN or does not contain the date.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ClosedPeriod` or `LedgerError::DateOutsideYear`.
    pub fn validate_year(input: &PostEntryInput, year: &AccountingYear) -> Result<(), LedgerError> {
        if input.year_id != year.id {
            return Err(LedgerError::YearNotFound(input.year_id));
        }
        if !year.status.allows_posting() {
            return Err(LedgerError::ClosedPeriod {
                year_id: year.id,
                status: year.status,
            });
        }
        if !year.contains_date(input.entry_date) {
            return Err(LedgerError::DateOutsideYear {
                date: input.entry_date,
                start: year.start_date,
                end: year.end_date,
            });
        }
        Ok(())
    }

    /// Debit amounts on expense-classified ledgers, summed per ledger in
    /// first-appearance order.
    #[must_use]
    pub fn expense_debits(lines: &[ResolvedLine]) -> Vec<(LedgerId, Decimal)> {
        aggregate(
            lines
                .iter()
                .filter(|l| l.side == Side::Debit && is_expense(l.ledger_type, l.nature))
                .map(|l| (l.ledger_id, l.amount)),
        )
    }

    /// Same as [`Self::expense_debits`] for stored lines, which do not carry
    /// ledger classification.
    #[must_use]
    pub fn stored_expense_debits<'l, L>(lines: &[EntryLine], ledger_lookup: L) -> Vec<(LedgerId, Decimal)>
    where
        L: Fn(LedgerId) -> Option<&'l Ledger>,
    {
        aggregate(
            lines
                .iter()
                .filter(|l| l.debit > Decimal::ZERO)
                .filter(|l| ledger_lookup(l.ledger_id).is_some_and(Ledger::is_expense_classified))
                .map(|l| (l.ledger_id, l.debit)),
        )
    }

    /// Runs the budget guard for each expense debit.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::BudgetOverrun` on the first breach under the strict policy.
    pub fn check_budgets<B>(
        debits: &[(LedgerId, Decimal)],
        policy: BudgetPolicy,
        budget_lookup: B,
    ) -> Result<Vec<BudgetOverrunWarning>, LedgerError>
    where
        B: Fn(LedgerId) -> BudgetPosition,
    {
        let mut warnings = Vec::new();
        for (ledger_id, amount) in debits {
            let check = BudgetGuard::check(*ledger_id, budget_lookup(*ledger_id), *amount);
            if let Some(warning) = BudgetGuard::enforce(&check, policy)? {
                warnings.push(warning);
            }
        }
        Ok(warnings)
    }

    /// Only PENDING entries may be edited or deleted.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotEditable` with the current status otherwise.
    pub fn ensure_editable(status: EntryStatus) -> Result<(), LedgerError> {
        if status.is_editable() {
            Ok(())
        } else {
            Err(LedgerError::NotEditable { status })
        }
    }

    /// Guards an amendment target: it must be APPROVED and in the same year.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotEditable` or `LedgerError::YearNotFound`.
    pub fn ensure_amendable(
        status: EntryStatus,
        original_year: AccountingYearId,
        replacement_year: AccountingYearId,
    ) -> Result<(), LedgerError> {
        if status != EntryStatus::Approved {
            return Err(LedgerError::NotEditable { status });
        }
        if original_year != replacement_year {
            return Err(LedgerError::YearNotFound(replacement_year));
        }
        Ok(())
    }
}

fn is_expense(ledger_type: LedgerType, nature: AccountNature) -> bool {
    ledger_type == LedgerType::Expense || nature == AccountNature::Expense
}

fn aggregate(items: impl Iterator<Item = (LedgerId, Decimal)>) -> Vec<(LedgerId, Decimal)> {
    let mut out: Vec<(LedgerId, Decimal)> = Vec::new();
    for (ledger_id, amount) in items {
        match out.iter_mut().find(|(id, _)| *id == ledger_id) {
            Some((_, total)) => *total += amount,
            None => out.push((ledger_id, amount)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use devalaya_shared::types::GroupId;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    use crate::fiscal::YearStatus;
    use crate::ledger::types::{EntryKind, EntryLineInput};

    struct Fixture {
        year: AccountingYear,
        ledgers: HashMap<LedgerId, Ledger>,
        bank: LedgerId,
        office: LedgerId,
        hundi: LedgerId,
    }

    fn make_ledger(code: &str, ledger_type: LedgerType, nature: AccountNature) -> Ledger {
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

    fn fixture() -> Fixture {
        let bank = make_ledger("BANK-SBI", LedgerType::Bank, AccountNature::Asset);
        let office = make_ledger("EXP-OFFICE", LedgerType::Expense, AccountNature::Expense);
        let hundi = make_ledger("INC-HUNDI", LedgerType::Income, AccountNature::Income);
        let ids = (bank.id, office.id, hundi.id);
        Fixture {
            year: AccountingYear {
                id: AccountingYearId::new(),
                name: "FY 2026-27".to_string(),
                start_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2027, 3, 31).unwrap(),
                status: YearStatus::Open,
                is_active: true,
            },
            ledgers: [bank, office, hundi].into_iter().map(|l| (l.id, l)).collect(),
            bank: ids.0,
            office: ids.1,
            hundi: ids.2,
        }
    }

    fn input(fx: &Fixture, kind: EntryKind, lines: Vec<EntryLineInput>) -> PostEntryInput {
        PostEntryInput {
            kind,
            year_id: fx.year.id,
            entry_date: NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
            narration: None,
            original_reference: None,
            lines,
        }
    }

    fn run(fx: &Fixture, input: &PostEntryInput, policy: BudgetPolicy, position: BudgetPosition) -> Result<ValidatedEntry, LedgerError> {
        let ctx = PostingContext {
            year: &fx.year,
            locked_periods: &[],
            budget_policy: policy,
        };
        EntryService::validate(input, &ctx, |id| fx.ledgers.get(&id), |_| position)
    }

    #[test]
    fn test_receipt_validates() {
        let fx = fixture();
        let entry = input(
            &fx,
            EntryKind::Receipt,
            vec![
                EntryLineInput::debit(fx.bank, dec!(1000.00)),
                EntryLineInput::credit(fx.hundi, dec!(1000.00)),
            ],
        );
        let validated = run(&fx, &entry, BudgetPolicy::Warn, BudgetPosition::default()).unwrap();
        assert_eq!(validated.lines.len(), 2);
        assert_eq!(validated.totals.debit, dec!(1000.00));
        assert!(validated.budget_warnings.is_empty());
    }

    #[test]
    fn test_payment_over_budget_warns() {
        let fx = fixture();
        let entry = input(
            &fx,
            EntryKind::Payment,
            vec![
                EntryLineInput::debit(fx.office, dec!(600.00)),
                EntryLineInput::credit(fx.bank, dec!(600.00)),
            ],
        );
        let position = BudgetPosition {
            allocated: Some(dec!(500.00)),
            spent: Decimal::ZERO,
        };

        let validated = run(&fx, &entry, BudgetPolicy::Warn, position).unwrap();
        assert_eq!(validated.budget_warnings.len(), 1);
        assert_eq!(validated.budget_warnings[0].overrun, dec!(100.00));

        assert!(matches!(
            run(&fx, &entry, BudgetPolicy::Strict, position),
            Err(LedgerError::BudgetOverrun { .. })
        ));
    }

    #[test]
    fn test_closed_year_checked_before_lines() {
        let mut fx = fixture();
        fx.year.status = YearStatus::Closed;
        let entry = input(&fx, EntryKind::Journal, vec![]);
        assert!(matches!(
            run(&fx, &entry, BudgetPolicy::Warn, BudgetPosition::default()),
            Err(LedgerError::ClosedPeriod { status: YearStatus::Closed, .. })
        ));

        fx.year.status = YearStatus::Closing;
        assert!(matches!(
            run(&fx, &entry, BudgetPolicy::Warn, BudgetPosition::default()),
            Err(LedgerError::ClosedPeriod { status: YearStatus::Closing, .. })
        ));
    }

    #[test]
    fn test_unbalanced_checked_before_ledgers() {
        let fx = fixture();
        let entry = input(
            &fx,
            EntryKind::Receipt,
            vec![
                EntryLineInput::debit(LedgerId::new(), dec!(100.00)),
                EntryLineInput::credit(fx.hundi, dec!(99.99)),
            ],
        );
        assert!(matches!(
            run(&fx, &entry, BudgetPolicy::Warn, BudgetPosition::default()),
            Err(LedgerError::Unbalanced { .. })
        ));
    }

    #[test]
    fn test_inactive_and_unknown_ledgers() {
        let mut fx = fixture();
        let unknown = LedgerId::new();
        let entry = input(
            &fx,
            EntryKind::Receipt,
            vec![
                EntryLineInput::debit(unknown, dec!(10)),
                EntryLineInput::credit(fx.hundi, dec!(10)),
            ],
        );
        assert!(matches!(
            run(&fx, &entry, BudgetPolicy::Warn, BudgetPosition::default()),
            Err(LedgerError::LedgerNotFound(id)) if id == unknown
        ));

        fx.ledgers.get_mut(&fx.hundi).unwrap().is_active = false;
        let entry = input(
            &fx,
            EntryKind::Receipt,
            vec![
                EntryLineInput::debit(fx.bank, dec!(10)),
                EntryLineInput::credit(fx.hundi, dec!(10)),
            ],
        );
        assert!(matches!(
            run(&fx, &entry, BudgetPolicy::Warn, BudgetPosition::default()),
            Err(LedgerError::LedgerInactive(_))
        ));
    }

    #[test]
    fn test_date_outside_year() {
        let fx = fixture();
        let mut entry = input(
            &fx,
            EntryKind::Receipt,
            vec![
                EntryLineInput::debit(fx.bank, dec!(10)),
                EntryLineInput::credit(fx.hundi, dec!(10)),
            ],
        );
        entry.entry_date = NaiveDate::from_ymd_opt(2027, 4, 1).unwrap();
        assert!(matches!(
            run(&fx, &entry, BudgetPolicy::Warn, BudgetPosition::default()),
            Err(LedgerError::DateOutsideYear { .. })
        ));
    }

    #[test]
    fn test_locked_period_rejects_bank_line() {
        let fx = fixture();
        let entry = input(
            &fx,
            EntryKind::Receipt,
            vec![
                EntryLineInput::debit(fx.bank, dec!(10)),
                EntryLineInput::credit(fx.hundi, dec!(10)),
            ],
        );
        let locks = [LockedPeriod {
            ledger_id: fx.bank,
            from: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
        }];
        let ctx = PostingContext {
            year: &fx.year,
            locked_periods: &locks,
            budget_policy: BudgetPolicy::Warn,
        };
        assert!(matches!(
            EntryService::validate(&entry, &ctx, |id| fx.ledgers.get(&id), |_| BudgetPosition::default()),
            Err(LedgerError::PeriodLocked { ledger_id, .. }) if ledger_id == fx.bank
        ));
    }

    #[test]
    fn test_ensure_unlocked_checks_every_ledger_and_bounds() {
        let fx = fixture();
        let locks = [LockedPeriod {
            ledger_id: fx.bank,
            from: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
        }];
        let june_30 = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let july_1 = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();

        assert!(matches!(
            EntryService::ensure_unlocked([fx.hundi, fx.bank], june_30, &locks),
            Err(LedgerError::PeriodLocked { ledger_id, date }) if ledger_id == fx.bank && date == june_30
        ));
        assert!(EntryService::ensure_unlocked([fx.hundi, fx.bank], july_1, &locks).is_ok());
        assert!(EntryService::ensure_unlocked([fx.hundi], june_30, &locks).is_ok());
        assert!(EntryService::ensure_unlocked([fx.bank], june_30, &[]).is_ok());
    }

    #[test]
    fn test_kind_rules_run_after_ledger_checks() {
        let fx = fixture();
        let entry = input(
            &fx,
            EntryKind::Receipt,
            vec![
                EntryLineInput::debit(fx.office, dec!(10)),
                EntryLineInput::credit(fx.hundi, dec!(10)),
            ],
        );
        assert!(matches!(
            run(&fx, &entry, BudgetPolicy::Warn, BudgetPosition::default()),
            Err(LedgerError::LedgerTypeNotAllowed { line: 1, .. })
        ));
    }

    #[test]
    fn test_expense_debits_aggregate_per_ledger() {
        let fx = fixture();
        let entry = input(
            &fx,
            EntryKind::Payment,
            vec![
                EntryLineInput::debit(fx.office, dec!(300)),
                EntryLineInput::debit(fx.office, dec!(300)),
                EntryLineInput::credit(fx.bank, dec!(600)),
            ],
        );
        let position = BudgetPosition {
            allocated: Some(dec!(500)),
            spent: Decimal::ZERO,
        };
        let validated = run(&fx, &entry, BudgetPolicy::Warn, position).unwrap();
        assert_eq!(validated.budget_warnings.len(), 1);
        assert_eq!(validated.budget_warnings[0].candidate, dec!(600));
    }

    #[test]
    fn test_editable_only_when_pending() {
        assert!(EntryService::ensure_editable(EntryStatus::Pending).is_ok());
        assert!(matches!(
            EntryService::ensure_editable(EntryStatus::Approved),
            Err(LedgerError::NotEditable { status: EntryStatus::Approved })
        ));
    }
}
