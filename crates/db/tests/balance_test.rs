//! Integration tests for balances, statements, and the trial balance.
//!
//! Run with: `DATABASE_URL=postgres://... cargo test -p devalaya-db --test balance_test`

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{Fixture, date};
use devalaya_core::ledger::LedgerError;
use devalaya_shared::BudgetPolicy;
use devalaya_shared::types::TempleId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_statement_runs_in_date_order_with_cutoff() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };
    fx.approved_receipt(&fx.bank, dec!(500), date(2026, 4, 10)).await;
    fx.approved_receipt(&fx.bank, dec!(200), date(2026, 6, 10)).await;
    let payment = fx
        .store
        .entries
        .post(fx.temple, &fx.clerk, fx.electricity_payment(dec!(150), date(2026, 5, 10)))
        .await
        .unwrap();
    fx.store
        .workflow
        .approve(fx.temple, payment.entry_id, &fx.accountant, None)
        .await
        .unwrap();

    let statement = fx
        .store
        .balances
        .statement(fx.temple, fx.bank.id, fx.year.id, None)
        .await
        .unwrap();
    let running: Vec<Decimal> = statement.lines.iter().map(|l| l.running.current).collect();
    assert_eq!(running, vec![dec!(500), dec!(350), dec!(550)]);
    assert_eq!(statement.closing, dec!(550));

    let cutoff = fx
        .store
        .balances
        .balance(fx.temple, fx.bank.id, fx.year.id, Some(date(2026, 5, 31)))
        .await
        .unwrap();
    assert_eq!(cutoff.closing, dec!(350));
    assert_eq!(cutoff.credit_total, dec!(150));
}

#[tokio::test]
async fn test_cached_balance_follows_new_approvals() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };

    fx.approved_receipt(&fx.cash, dec!(30), date(2026, 4, 3)).await;
    assert_eq!(fx.closing(&fx.cash).await, dec!(30));

    // Served from the cache until the next approval invalidates it.
    fx.approved_receipt(&fx.cash, dec!(20), date(2026, 4, 4)).await;
    assert_eq!(fx.closing(&fx.cash).await, dec!(50));
}

#[tokio::test]
async fn test_trial_balance_agrees() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };
    fx.approved_receipt(&fx.bank, dec!(900), date(2026, 8, 15)).await;
    let payment = fx
        .store
        .entries
        .post(fx.temple, &fx.clerk, fx.electricity_payment(dec!(400), date(2026, 8, 16)))
        .await
        .unwrap();
    fx.store
        .workflow
        .approve(fx.temple, payment.entry_id, &fx.accountant, None)
        .await
        .unwrap();

    let trial = fx
        .store
        .balances
        .trial_balance(fx.temple, fx.year.id, None)
        .await
        .unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.total_debit, dec!(900));
    assert_eq!(trial.total_credit, dec!(900));
    // Cash and the general fund never moved.
    assert_eq!(trial.rows.len(), 3);
}

#[tokio::test]
async fn test_cached_balance_is_not_served_to_another_temple() {
    let Some(fx) = Fixture::new(BudgetPolicy::Warn).await else { return };
    fx.approved_receipt(&fx.bank, dec!(900), date(2026, 7, 1)).await;
    assert_eq!(fx.closing(&fx.bank).await, dec!(900));

    let foreign = fx
        .store
        .balances
        .balance(TempleId::new(), fx.bank.id, fx.year.id, None)
        .await;
    assert!(matches!(foreign, Err(LedgerError::YearNotFound(_))));
}
