//! Property-based tests for `EntryService`.

use chrono::NaiveDate;
use devalaya_shared::BudgetPolicy;
use devalaya_shared::types::{AccountingYearId, GroupId, LedgerId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::service::{EntryService, PostingContext};
use super::types::{EntryKind, EntryLineInput, PostEntryInput};
use crate::budget::types::BudgetPosition;
use crate::chart::types::{AccountNature, Ledger, LedgerType};
use crate::fiscal::{AccountingYear, YearStatus};

fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|paise| Decimal::new(paise, 2))
}

fn kind_strategy() -> impl Strategy<Value = EntryKind> {
    prop::sample::select(EntryKind::ALL.to_vec())
}

fn ledger(ledger_type: LedgerType, nature: AccountNature) -> Ledger {
    Ledger {
        id: LedgerId::new(),
        code: ledger_type.as_str().to_string(),
        name: ledger_type.as_str().to_string(),
        group_id: GroupId::new(),
        ledger_type,
        nature,
        opening_balance: Decimal::ZERO,
        opening_year_id: None,
        is_active: true,
    }
}

fn year(status: YearStatus) -> AccountingYear {
    AccountingYear {
        id: AccountingYearId::new(),
        name: "FY 2026-27".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2027, 3, 31).unwrap(),
        status,
        is_active: true,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 4.1: A year that is not OPEN rejects every kind**
    ///
    /// *For any* entry kind and amount, posting into a CLOSED or CLOSING year
    /// fails with `ClosedPeriod`, regardless of how well formed the lines are.
    #[test]
    fn prop_closed_year_rejects_every_kind(
        kind in kind_strategy(),
        amount in positive_amount(),
        closing in any::<bool>(),
    ) {
        let status = if closing { YearStatus::Closing } else { YearStatus::Closed };
        let year = year(status);
        let bank = ledger(LedgerType::Bank, AccountNature::Asset);
        let cash = ledger(LedgerType::Cash, AccountNature::Asset);

        let input = PostEntryInput {
            kind,
            year_id: year.id,
            entry_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            narration: Some("transfer".to_string()),
            original_reference: Some("REF-1".to_string()),
            lines: vec![
                EntryLineInput::debit(bank.id, amount).with_narration("transfer"),
                EntryLineInput::credit(cash.id, amount).with_narration("transfer"),
            ],
        };
        let ctx = PostingContext { year: &year, locked_periods: &[], budget_policy: BudgetPolicy::Warn };
        let ledgers = [bank, cash];

        let result = EntryService::validate(
            &input,
            &ctx,
            |id| ledgers.iter().find(|l| l.id == id),
            |_| BudgetPosition::default(),
        );
        prop_assert!(
            matches!(result, Err(LedgerError::ClosedPeriod { .. })),
            "expected ClosedPeriod"
        );
    }

    /// **Property 4.2: Accepted entries are balanced**
    ///
    /// *For any* split of a receipt across income ledgers, validation succeeds
    /// and the totals agree.
    #[test]
    fn prop_accepted_entries_balance(parts in prop::collection::vec(positive_amount(), 1..5)) {
        let year = year(YearStatus::Open);
        let bank = ledger(LedgerType::Bank, AccountNature::Asset);
        let incomes: Vec<Ledger> = parts.iter().map(|_| ledger(LedgerType::Income, AccountNature::Income)).collect();
        let total: Decimal = parts.iter().copied().sum();

        let mut lines = vec![EntryLineInput::debit(bank.id, total)];
        lines.extend(incomes.iter().zip(&parts).map(|(l, a)| EntryLineInput::credit(l.id, *a)));

        let input = PostEntryInput {
            kind: EntryKind::Receipt,
            year_id: year.id,
            entry_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            narration: None,
            original_reference: None,
            lines,
        };
        let ctx = PostingContext { year: &year, locked_periods: &[], budget_policy: BudgetPolicy::Strict };

        let validated = EntryService::validate(
            &input,
            &ctx,
            |id| if id == bank.id { Some(&bank) } else { incomes.iter().find(|l| l.id == id) },
            |_| BudgetPosition::default(),
        ).unwrap();

        prop_assert!(validated.totals.is_balanced);
        prop_assert_eq!(validated.totals.debit, total);
        prop_assert_eq!(validated.lines.len(), parts.len() + 1);
    }
}
