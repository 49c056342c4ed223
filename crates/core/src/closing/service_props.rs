//! Property-based tests for `ClosingService`.

use devalaya_shared::types::{AccountingYearId, GroupId, LedgerId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::chart::types::{AccountNature, Ledger, LedgerType};
use crate::closing::service::ClosingService;
use crate::ledger::balance::{BalanceEngine, BalanceSnapshot};

fn arb_nature() -> impl Strategy<Value = AccountNature> {
    prop_oneof![
        Just(AccountNature::Asset),
        Just(AccountNature::Liability),
        Just(AccountNature::Equity),
        Just(AccountNature::Income),
        Just(AccountNature::Expense),
    ]
}

/// Ledgers with random natures and debit/credit totals in paise.
fn arb_balances() -> impl Strategy<Value = Vec<(Ledger, BalanceSnapshot)>> {
    prop::collection::vec((arb_nature(), 0i64..100_000_000, 0i64..100_000_000), 1..30).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (nature, debit, credit))| {
                let ledger = Ledger {
                    id: LedgerId::new(),
                    code: format!("{i:04}"),
                    name: format!("Ledger {i}"),
                    group_id: GroupId::new(),
                    ledger_type: LedgerType::Normal,
                    nature,
                    opening_balance: Decimal::ZERO,
                    opening_year_id: None,
                    is_active: true,
                };
                let snapshot =
                    BalanceEngine::snapshot(nature, Decimal::ZERO, Decimal::new(debit, 2), Decimal::new(credit, 2));
                (ledger, snapshot)
            })
            .collect()
    })
}

fn surplus_ledger() -> Ledger {
    Ledger {
        id: LedgerId::new(),
        code: "3100".to_string(),
        name: "General Fund".to_string(),
        group_id: GroupId::new(),
        ledger_type: LedgerType::Normal,
        nature: AccountNature::Equity,
        opening_balance: Decimal::ZERO,
        opening_year_id: None,
        is_active: true,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 10.1: Closing figures are deterministic**
    ///
    /// *For any* set of balances, planning twice yields identical figures, so
    /// a resumed run writes exactly what the first run would have.
    #[test]
    fn prop_plan_is_deterministic(balances in arb_balances()) {
        let year = AccountingYearId::new();
        let next = AccountingYearId::new();
        let fund = surplus_ledger();

        let first = ClosingService::plan(year, next, &balances, Some(&fund)).unwrap();
        let second = ClosingService::plan(year, next, &balances, Some(&fund)).unwrap();
        prop_assert_eq!(first, second);
    }

    /// **Property 10.2: Closing the nominal ledgers preserves the total carried**
    ///
    /// *For any* set of balances, moving the surplus into equity carries the
    /// same real-ledger balances plus exactly the year's net surplus.
    #[test]
    fn prop_surplus_moves_without_loss(balances in arb_balances()) {
        let year = AccountingYearId::new();
        let next = AccountingYearId::new();
        let fund = surplus_ledger();

        let plain = ClosingService::plan(year, next, &balances, None).unwrap();
        let closed = ClosingService::plan(year, next, &balances, Some(&fund)).unwrap();

        let real_total: Decimal = plain
            .figures
            .iter()
            .filter(|f| !f.nature.is_nominal())
            .map(|f| f.carried_forward)
            .sum();
        let carried_total: Decimal = closed.figures.iter().map(|f| f.carried_forward).sum();

        prop_assert_eq!(carried_total, real_total + closed.surplus);
        prop_assert!(closed
            .figures
            .iter()
            .filter(|f| f.nature.is_nominal())
            .all(|f| f.carried_forward.is_zero()));
        prop_assert_eq!(plain.surplus, closed.surplus);
    }
}
