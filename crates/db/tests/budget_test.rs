//! Integration tests for budget lifecycle and overrun policies.
//!
//! Run with: `DATABASE_URL=postgres://... cargo test -p devalaya-db --test budget_test`

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{Fixture, date};
use devalaya_core::budget::{BudgetAction, BudgetError, BudgetStatus, CreateBudgetInput};
use devalaya_core::ledger::LedgerError;
use devalaya_core::workflow::WorkflowError;
use devalaya_shared::BudgetPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Creates, submits, and approves an electricity budget.
async fn approved_budget(fx: &Fixture, allocated: Decimal) {
    let budget = fx
        .store
        .budgets
        .create(
            fx.temple,
            fx.accountant.id,
            CreateBudgetInput {
                ledger_id: fx.electricity.id,
                year_id: fx.year.id,
                allocated,
                notes: Some("Annual electricity".to_string()),
            },
        )
        .await
        .expect("create budget");
    assert_eq!(budget.status, BudgetStatus::Draft);

    fx.store
        .budgets
        .transition(fx.temple, budget.id, BudgetAction::Submit)
        .await
        .expect("submit budget");
    let approved = fx
        .store
        .budgets
        .transition(fx.temple, budget.id, BudgetAction::Approve)
        .await
        .expect("approve budget");
    assert_eq!(approved.status, BudgetStatus::Approved);
}

#[tokio::test]
async fn test_warn_policy_posts_with_warning() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };
    approved_budget(&fx, dec!(1000)).await;

    let posted = fx
        .store
        .entries
        .post(fx.temple, &fx.clerk, fx.electricity_payment(dec!(1200), date(2026, 6, 30)))
        .await
        .expect("overrun is only a warning");

    assert_eq!(posted.budget_warnings.len(), 1);
    let warning = &posted.budget_warnings[0];
    assert_eq!(warning.ledger_id, fx.electricity.id);
    assert_eq!(warning.allocated, dec!(1000));
    assert_eq!(warning.overrun, dec!(200));
}

#[tokio::test]
async fn test_strict_policy_blocks_posting() {
    let Some(fx) = Fixture::new(BudgetPolicy::Strict).await else { return };
    approved_budget(&fx, dec!(1000)).await;

    let result = fx
        .store
        .entries
        .post(fx.temple, &fx.clerk, fx.electricity_payment(dec!(1200), date(2026, 6, 30)))
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::BudgetOverrun { overrun, .. }) if overrun == dec!(200)
    ));
}

#[tokio::test]
async fn test_strict_policy_rechecks_on_approval() {
    let Some(fx) = Fixture::new(BudgetPolicy::Strict).await else { return };
    approved_budget(&fx, dec!(1000)).await;

    // Each fits alone; together they exceed the allocation.
    let first = fx
        .store
        .entries
        .post(fx.temple, &fx.clerk, fx.electricity_payment(dec!(600), date(2026, 7, 31)))
        .await
        .unwrap();
    let second = fx
        .store
        .entries
        .post(fx.temple, &fx.clerk, fx.electricity_payment(dec!(600), date(2026, 8, 31)))
        .await
        .unwrap();

    fx.store
        .workflow
        .approve(fx.temple, first.entry_id, &fx.accountant, None)
        .await
        .expect("first approval fits the budget");
    let result = fx
        .store
        .workflow
        .approve(fx.temple, second.entry_id, &fx.accountant, None)
        .await;
    assert!(matches!(
        result,
        Err(WorkflowError::BudgetOverrun { overrun, .. }) if overrun == dec!(200)
    ));
    assert_eq!(fx.closing(&fx.electricity).await, dec!(600));
}

#[tokio::test]
async fn test_budget_only_for_income_and_expense() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };

    let result = fx
        .store
        .budgets
        .create(
            fx.temple,
            fx.accountant.id,
            CreateBudgetInput {
                ledger_id: fx.bank.id,
                year_id: fx.year.id,
                allocated: dec!(500),
                notes: None,
            },
        )
        .await;
    assert!(matches!(result, Err(BudgetError::NotBudgetable { .. })));
}

#[tokio::test]
async fn test_variance_report_uses_approved_spend() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };
    approved_budget(&fx, dec!(1000)).await;

    let approved = fx
        .store
        .entries
        .post(fx.temple, &fx.clerk, fx.electricity_payment(dec!(400), date(2026, 5, 31)))
        .await
        .unwrap();
    fx.store
        .workflow
        .approve(fx.temple, approved.entry_id, &fx.accountant, None)
        .await
        .unwrap();
    // Pending spend is not actual spend.
    fx.store
        .entries
        .post(fx.temple, &fx.clerk, fx.electricity_payment(dec!(300), date(2026, 6, 30)))
        .await
        .unwrap();

    let report = fx.store.budgets.variance_report(fx.temple, fx.year.id).await.unwrap();
    assert_eq!(report.lines.len(), 1);
    assert_eq!(report.total_budgeted, dec!(1000));
    assert_eq!(report.total_actual, dec!(400));
    assert_eq!(report.lines[0].variance.variance_amount, dec!(600));
}
