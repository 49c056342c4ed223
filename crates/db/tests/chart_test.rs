//! Integration tests for the chart of accounts and accounting years.
//!
//! Run with: `DATABASE_URL=postgres://... cargo test -p devalaya-db --test chart_test`

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{Fixture, date};
use devalaya_core::chart::{AccountNature, ChartError};
use devalaya_core::fiscal::FiscalError;
use devalaya_db::repositories::CreateGroupInput;
use devalaya_shared::BudgetPolicy;
use rust_decimal_macros::dec;

// ============================================================================
// Chart of accounts
// ============================================================================

#[tokio::test]
async fn test_subgroups_roll_up_into_parents() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };

    let sevas = fx
        .store
        .chart
        .create_group(
            fx.temple,
            CreateGroupInput {
                code: "4200".to_string(),
                name: "Seva Income".to_string(),
                parent_id: Some(fx.donations.group_id),
                nature: AccountNature::Income,
            },
        )
        .await
        .expect("create subgroup");

    let mismatched = fx
        .store
        .chart
        .create_group(
            fx.temple,
            CreateGroupInput {
                code: "4300".to_string(),
                name: "Misfiled".to_string(),
                parent_id: Some(fx.donations.group_id),
                nature: AccountNature::Expense,
            },
        )
        .await;
    assert!(matches!(mismatched, Err(ChartError::NatureMismatch { .. })));

    let cycle = fx
        .store
        .chart
        .move_group(fx.temple, fx.donations.group_id, Some(sevas.id))
        .await;
    assert!(matches!(cycle, Err(ChartError::CycleDetected { .. })));

    fx.approved_receipt(&fx.cash, dec!(120), date(2026, 4, 2)).await;

    let summary = fx
        .store
        .balances
        .group_summary(fx.temple, fx.year.id, None)
        .await
        .unwrap();
    let income = summary
        .iter()
        .find(|g| g.group_id == fx.donations.group_id)
        .expect("income group");
    assert_eq!(income.total, dec!(120));
    assert_eq!(income.children.len(), 1);
    assert_eq!(income.children[0].group_id, sevas.id);

    let tree = fx.store.chart.tree(fx.temple).await.unwrap();
    assert_eq!(tree.len(), 4);
}

#[tokio::test]
async fn test_referenced_ledger_cannot_be_deleted() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };
    fx.approved_receipt(&fx.cash, dec!(10), date(2026, 4, 2)).await;

    let result = fx.store.chart.delete_ledger(fx.temple, fx.cash.id).await;
    assert!(matches!(result, Err(ChartError::ReferencedEntity { references: 1, .. })));

    let group = fx.store.chart.delete_group(fx.temple, fx.cash.group_id).await;
    assert!(matches!(group, Err(ChartError::GroupNotEmpty(_))));

    // The equity ledger has never been used.
    fx.store
        .chart
        .delete_ledger(fx.temple, fx.general_fund.id)
        .await
        .expect("delete unused ledger");
    let gone = fx.store.chart.get_ledger(fx.temple, fx.general_fund.id).await;
    assert!(matches!(gone, Err(ChartError::LedgerNotFound(_))));
}

#[tokio::test]
async fn test_ledger_carried_by_a_closing_cannot_be_deleted() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };
    fx.reconcile_year(&fx.bank).await;
    fx.reconcile_year(&fx.cash).await;

    // The equity ledger never had a line, but the closing writes its marker
    // and its next-year opening.
    fx.store
        .close_year(fx.temple, fx.year.id, &fx.accountant, None)
        .await
        .expect("close empty year");

    let result = fx.store.chart.delete_ledger(fx.temple, fx.general_fund.id).await;
    assert!(
        matches!(result, Err(ChartError::ReferencedEntity { ledger, references }) if ledger == fx.general_fund.id && references >= 1),
        "got {result:?}"
    );
    assert!(fx.store.chart.get_ledger(fx.temple, fx.general_fund.id).await.is_ok());
}

#[tokio::test]
async fn test_inactive_ledger_rejects_postings() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };

    let missing = fx
        .store
        .chart
        .set_ledger_active(fx.temple, devalaya_shared::types::LedgerId::new(), false)
        .await;
    assert!(matches!(missing, Err(ChartError::LedgerNotFound(_))));

    let deactivated = fx
        .store
        .chart
        .set_ledger_active(fx.temple, fx.cash.id, false)
        .await
        .unwrap();
    assert!(!deactivated.is_active);
    assert!(!fx.store.chart.load(fx.temple).await.unwrap().ledger(fx.cash.id).unwrap().is_active);
    let result = fx
        .store
        .entries
        .post(fx.temple, &fx.clerk, fx.receipt(&fx.cash, dec!(10), date(2026, 4, 2)))
        .await;
    assert!(matches!(
        result,
        Err(devalaya_core::ledger::LedgerError::LedgerInactive(id)) if id == fx.cash.id
    ));

    let reactivated = fx
        .store
        .chart
        .set_ledger_active(fx.temple, fx.cash.id, true)
        .await
        .unwrap();
    assert!(reactivated.is_active);
    fx.store
        .entries
        .post(fx.temple, &fx.clerk, fx.receipt(&fx.cash, dec!(10), date(2026, 4, 2)))
        .await
        .expect("post after reactivation");
}

// ============================================================================
// Accounting years
// ============================================================================

#[tokio::test]
async fn test_years_never_overlap() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };

    let result = fx
        .store
        .fiscal
        .create(fx.temple, "Overlap".to_string(), date(2027, 1, 1), date(2027, 12, 31))
        .await;
    assert!(matches!(result, Err(FiscalError::OverlappingYear(_))));

    let backwards = fx
        .store
        .fiscal
        .create(fx.temple, "Backwards".to_string(), date(2029, 3, 31), date(2028, 4, 1))
        .await;
    assert!(matches!(backwards, Err(FiscalError::InvalidDateRange { .. })));
}

#[tokio::test]
async fn test_one_active_year_per_temple() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };

    assert_eq!(fx.store.fiscal.active(fx.temple).await.unwrap().map(|y| y.id), Some(fx.year.id));

    fx.store.fiscal.set_active(fx.temple, fx.next_year.id).await.unwrap();
    let years = fx.store.fiscal.list(fx.temple).await.unwrap();
    assert_eq!(years.iter().filter(|y| y.is_active).count(), 1);
    assert_eq!(fx.store.fiscal.active(fx.temple).await.unwrap().map(|y| y.id), Some(fx.next_year.id));

    let next = fx.store.fiscal.next_year(fx.temple, fx.year.id).await.unwrap();
    assert_eq!(next.map(|y| y.id), Some(fx.next_year.id));
}
