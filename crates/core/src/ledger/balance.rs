//! Ledger balance calculations.
//!
//! Balances are never stored. A balance is the ledger's opening for the year
//! plus the signed effect of its APPROVED lines, computed on read.

use chrono::NaiveDate;
use devalaya_shared::types::{AccountingYearId, EntryId, EntryLineId, LedgerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::EntryKind;
use crate::chart::types::{AccountNature, Ledger};

/// Direction in which a ledger's balance grows.
///
/// - Asset/Expense: balance += debit - credit (debit-normal)
/// - Liability/Equity/Income: balance += credit - debit (credit-normal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Debit-normal ledgers (Asset, Expense).
    Debit,
    /// Credit-normal ledgers (Liability, Equity, Income).
    Credit,
}

impl NormalBalance {
    /// Calculates the balance change for one line.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Running balance after one statement line.
///
/// - `sequence` increases by one per line
/// - `previous` equals the `current` of the line before
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// 1-based position in the statement.
    pub sequence: u64,
    /// Balance before this line.
    pub previous: Decimal,
    /// Balance after this line.
    pub current: Decimal,
}

impl RunningBalance {
    /// Running balance of the first line, starting from the opening balance.
    #[must_use]
    pub fn first_entry(opening: Decimal, balance_change: Decimal) -> Self {
        Self {
            sequence: 1,
            previous: opening,
            current: opening + balance_change,
        }
    }

    /// Running balance of the line after `previous`.
    #[must_use]
    pub fn next_entry(previous: &Self, balance_change: Decimal) -> Self {
        Self {
            sequence: previous.sequence + 1,
            previous: previous.current,
            current: previous.current + balance_change,
        }
    }
}

/// An approved line as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedLine {
    /// Owning entry.
    pub entry_id: EntryId,
    /// The line.
    pub line_id: EntryLineId,
    /// The ledger.
    pub ledger_id: LedgerId,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Entry kind.
    pub kind: EntryKind,
    /// Position within the entry.
    pub line_no: u32,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Line narration, falling back to the entry narration.
    pub narration: Option<String>,
}

/// One row of a ledger statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementLine {
    /// Owning entry.
    pub entry_id: EntryId,
    /// The line.
    pub line_id: EntryLineId,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Entry kind.
    pub kind: EntryKind,
    /// Narration.
    pub narration: Option<String>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Running balance after this line.
    pub running: RunningBalance,
}

/// Balance of a ledger with its ordered transaction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStatement {
    /// The ledger.
    pub ledger_id: LedgerId,
    /// The year.
    pub year_id: AccountingYearId,
    /// Cut-off date, `None` for the whole year.
    pub as_of: Option<NaiveDate>,
    /// Opening balance for the year.
    pub opening: Decimal,
    /// Sum of debits in the statement.
    pub debit_total: Decimal,
    /// Sum of credits in the statement.
    pub credit_total: Decimal,
    /// Opening plus the signed effect of every line.
    pub closing: Decimal,
    /// Lines ordered by date, then posting order.
    pub lines: Vec<StatementLine>,
}

/// Debit/credit totals and closing balance of a ledger for a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Opening balance.
    pub opening: Decimal,
    /// Sum of approved debits.
    pub debit_total: Decimal,
    /// Sum of approved credits.
    pub credit_total: Decimal,
    /// Closing balance in the ledger's normal direction.
    pub closing: Decimal,
}

/// Stateless balance engine.
pub struct BalanceEngine;

impl BalanceEngine {
    /// Opening balance of a ledger for a year.
    ///
    /// A carried-forward row written by year-end closing wins; otherwise the
    /// ledger's own opening applies to its creation year only.
    #[must_use]
    pub fn opening(ledger: &Ledger, year_id: AccountingYearId, carried: Option<Decimal>) -> Decimal {
        carried.unwrap_or_else(|| ledger.own_opening_for(year_id))
    }

    /// Builds a statement from the approved lines of one ledger and year.
    ///
    /// Lines of other ledgers and lines dated after `as_of` are ignored. The
    /// input is expected in posting order; the sort on date is stable.
    #[must_use]
    pub fn statement(
        ledger_id: LedgerId,
        nature: AccountNature,
        year_id: AccountingYearId,
        opening: Decimal,
        lines: &[ApprovedLine],
        as_of: Option<NaiveDate>,
    ) -> LedgerStatement {
        let normal = nature.normal_balance();

        let mut selected: Vec<&ApprovedLine> = lines
            .iter()
            .filter(|l| l.ledger_id == ledger_id)
            .filter(|l| as_of.is_none_or(|cutoff| l.entry_date <= cutoff))
            .collect();
        selected.sort_by_key(|l| l.entry_date);

        let mut rows: Vec<StatementLine> = Vec::with_capacity(selected.len());
        for line in selected {
            let change = normal.balance_change(line.debit, line.credit);
            let running = match rows.last() {
                Some(prev) => RunningBalance::next_entry(&prev.running, change),
                None => RunningBalance::first_entry(opening, change),
            };
            rows.push(StatementLine {
                entry_id: line.entry_id,
                line_id: line.line_id,
                entry_date: line.entry_date,
                kind: line.kind,
                narration: line.narration.clone(),
                debit: line.debit,
                credit: line.credit,
                running,
            });
        }

        let debit_total = rows.iter().map(|r| r.debit).sum();
        let credit_total = rows.iter().map(|r| r.credit).sum();
        let closing = rows.last().map_or(opening, |r| r.running.current);

        LedgerStatement {
            ledger_id,
            year_id,
            as_of,
            opening,
            debit_total,
            credit_total,
            closing,
            lines: rows,
        }
    }

    /// Balance from opening and debit/credit totals.
    #[must_use]
    pub fn snapshot(nature: AccountNature, opening: Decimal, debit_total: Decimal, credit_total: Decimal) -> BalanceSnapshot {
        BalanceSnapshot {
            opening,
            debit_total,
            credit_total,
            closing: opening + nature.normal_balance().balance_change(debit_total, credit_total),
        }
    }

    /// Applies one entry's lines to a snapshot, or removes them when `reverse` is set.
    #[must_use]
    pub fn apply(
        nature: AccountNature,
        snapshot: BalanceSnapshot,
        debit: Decimal,
        credit: Decimal,
        reverse: bool,
    ) -> BalanceSnapshot {
        let (debit, credit) = if reverse { (-debit, -credit) } else { (debit, credit) };
        Self::snapshot(
            nature,
            snapshot.opening,
            snapshot.debit_total + debit,
            snapshot.credit_total + credit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn line(ledger_id: LedgerId, day: u32, debit: Decimal, credit: Decimal) -> ApprovedLine {
        ApprovedLine {
            entry_id: EntryId::new(),
            line_id: EntryLineId::new(),
            ledger_id,
            entry_date: NaiveDate::from_ymd_opt(2026, 5, day).unwrap(),
            kind: EntryKind::Receipt,
            line_no: 1,
            debit,
            credit,
            narration: None,
        }
    }

    #[test]
    fn test_normal_balance_direction() {
        assert_eq!(NormalBalance::Debit.balance_change(dec!(100), dec!(30)), dec!(70));
        assert_eq!(NormalBalance::Credit.balance_change(dec!(100), dec!(30)), dec!(-70));
    }

    #[test]
    fn test_bank_statement_with_opening() {
        let bank = LedgerId::new();
        let year = AccountingYearId::new();
        let lines = vec![
            line(bank, 10, Decimal::ZERO, dec!(200)),
            line(bank, 2, dec!(1000), Decimal::ZERO),
            line(LedgerId::new(), 3, dec!(999), Decimal::ZERO),
        ];

        let statement = BalanceEngine::statement(bank, AccountNature::Asset, year, dec!(500), &lines, None);

        assert_eq!(statement.lines.len(), 2);
        assert_eq!(statement.lines[0].entry_date, NaiveDate::from_ymd_opt(2026, 5, 2).unwrap());
        assert_eq!(statement.lines[0].running.previous, dec!(500));
        assert_eq!(statement.lines[0].running.current, dec!(1500));
        assert_eq!(statement.lines[1].running.current, dec!(1300));
        assert_eq!(statement.closing, dec!(1300));
        assert_eq!(statement.debit_total, dec!(1000));
        assert_eq!(statement.credit_total, dec!(200));
    }

    #[test]
    fn test_as_of_cutoff_is_inclusive() {
        let hundi = LedgerId::new();
        let lines = vec![
            line(hundi, 1, Decimal::ZERO, dec!(100)),
            line(hundi, 15, Decimal::ZERO, dec!(50)),
            line(hundi, 16, Decimal::ZERO, dec!(25)),
        ];
        let cutoff = NaiveDate::from_ymd_opt(2026, 5, 15).unwrap();

        let statement = BalanceEngine::statement(
            hundi,
            AccountNature::Income,
            AccountingYearId::new(),
            Decimal::ZERO,
            &lines,
            Some(cutoff),
        );
        assert_eq!(statement.closing, dec!(150));
    }

    #[test]
    fn test_empty_statement_closes_at_opening() {
        let statement = BalanceEngine::statement(
            LedgerId::new(),
            AccountNature::Liability,
            AccountingYearId::new(),
            dec!(42),
            &[],
            None,
        );
        assert_eq!(statement.closing, dec!(42));
        assert!(statement.lines.is_empty());
    }

    #[test]
    fn test_carried_opening_wins() {
        let year = AccountingYearId::new();
        let ledger = Ledger {
            id: LedgerId::new(),
            code: "BANK".to_string(),
            name: "Bank".to_string(),
            group_id: devalaya_shared::types::GroupId::new(),
            ledger_type: crate::chart::types::LedgerType::Bank,
            nature: AccountNature::Asset,
            opening_balance: dec!(100),
            opening_year_id: Some(year),
            is_active: true,
        };
        assert_eq!(BalanceEngine::opening(&ledger, year, None), dec!(100));
        assert_eq!(BalanceEngine::opening(&ledger, year, Some(dec!(250))), dec!(250));
        assert_eq!(BalanceEngine::opening(&ledger, AccountingYearId::new(), None), Decimal::ZERO);
    }

    fn amount() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000i64).prop_map(|p| Decimal::new(p, 2))
    }

    fn nature() -> impl Strategy<Value = AccountNature> {
        prop_oneof![
            Just(AccountNature::Asset),
            Just(AccountNature::Liability),
            Just(AccountNature::Equity),
            Just(AccountNature::Income),
            Just(AccountNature::Expense),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// **Property 5.1: Running balances chain**
        ///
        /// *For any* statement, each line's previous balance equals the line
        /// before's current balance, and the last current equals the closing.
        #[test]
        fn prop_running_balance_chain(
            nature in nature(),
            opening in amount(),
            amounts in prop::collection::vec((amount(), amount(), 1u32..28), 0..30),
        ) {
            let ledger = LedgerId::new();
            let lines: Vec<ApprovedLine> = amounts.iter().map(|(d, c, day)| line(ledger, *day, *d, *c)).collect();
            let statement = BalanceEngine::statement(ledger, nature, AccountingYearId::new(), opening, &lines, None);

            let mut expected_previous = opening;
            for (i, row) in statement.lines.iter().enumerate() {
                prop_assert_eq!(row.running.sequence, i as u64 + 1);
                prop_assert_eq!(row.running.previous, expected_previous);
                expected_previous = row.running.current;
            }
            prop_assert_eq!(statement.closing, expected_previous);
        }

        /// **Property 5.2: Incremental updates equal recomputation**
        ///
        /// *For any* sequence of approved lines, folding them one at a time into
        /// a snapshot gives the same closing as computing the statement from
        /// scratch.
        #[test]
        fn prop_incremental_equals_from_scratch(
            nature in nature(),
            opening in amount(),
            amounts in prop::collection::vec((amount(), amount()), 0..30),
        ) {
            let ledger = LedgerId::new();
            let lines: Vec<ApprovedLine> = amounts.iter().map(|(d, c)| line(ledger, 1, *d, *c)).collect();

            let mut snapshot = BalanceEngine::snapshot(nature, opening, Decimal::ZERO, Decimal::ZERO);
            for (d, c) in &amounts {
                snapshot = BalanceEngine::apply(nature, snapshot, *d, *c, false);
            }
            let statement = BalanceEngine::statement(ledger, nature, AccountingYearId::new(), opening, &lines, None);

            prop_assert_eq!(snapshot.closing, statement.closing);
            prop_assert_eq!(snapshot.debit_total, statement.debit_total);
            prop_assert_eq!(snapshot.credit_total, statement.credit_total);
        }

        /// **Property 5.3: Cancelling an approved entry restores the balance**
        #[test]
        fn prop_cancellation_round_trip(
            nature in nature(),
            opening in amount(),
            debit in amount(),
            credit in amount(),
        ) {
            let before = BalanceEngine::snapshot(nature, opening, Decimal::ZERO, Decimal::ZERO);
            let approved = BalanceEngine::apply(nature, before, debit, credit, false);
            let cancelled = BalanceEngine::apply(nature, approved, debit, credit, true);
            prop_assert_eq!(cancelled, before);
        }
    }
}
