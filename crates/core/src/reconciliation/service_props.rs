//! Property-based tests for `ReconciliationService`.

use std::collections::HashSet;

use chrono::NaiveDate;
use devalaya_shared::types::{AccountingYearId, ActorId, EntryId, EntryLineId, LedgerId, ReconciliationId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::ledger::balance::ApprovedLine;
use crate::ledger::types::EntryKind;
use crate::reconciliation::error::ReconciliationError;
use crate::reconciliation::service::ReconciliationService;
use crate::reconciliation::types::{ItemStatus, ReconciliationSession, SessionStatus};

fn session(ledger_id: LedgerId) -> ReconciliationSession {
    ReconciliationSession {
        id: ReconciliationId::new(),
        ledger_id,
        year_id: AccountingYearId::new(),
        period_from: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
        period_to: NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
        statement_balance: Decimal::ZERO,
        status: SessionStatus::InProgress,
        created_by: ActorId::new(),
        finalized_at: None,
        locked_by: None,
    }
}

/// Lines on the ledger, each with a day of April and an amount in paise.
fn arb_lines(ledger_id: LedgerId) -> impl Strategy<Value = Vec<ApprovedLine>> {
    prop::collection::vec((1u32..=30, 1i64..10_000_000, any::<bool>()), 1..20).prop_map(move |rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (day, paise, is_debit))| {
                let amount = Decimal::new(paise, 2);
                ApprovedLine {
                    entry_id: EntryId::new(),
                    line_id: EntryLineId::new(),
                    ledger_id,
                    entry_date: NaiveDate::from_ymd_opt(2026, 4, day).unwrap(),
                    kind: EntryKind::Receipt,
                    line_no: u32::try_from(i).unwrap_or(u32::MAX),
                    debit: if is_debit { amount } else { Decimal::ZERO },
                    credit: if is_debit { Decimal::ZERO } else { amount },
                    narration: None,
                }
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 9.1: Finalize succeeds iff nothing is unmatched**
    ///
    /// *For any* set of items and any match pattern, finalizing succeeds
    /// exactly when every item is matched, and otherwise reports the count.
    #[test]
    fn prop_finalize_requires_all_matched(
        lines in arb_lines(LedgerId::new()),
        pattern in prop::collection::vec(any::<bool>(), 20),
    ) {
        let mut s = session(LedgerId::new());
        s.ledger_id = lines[0].ledger_id;
        let mut items = ReconciliationService::candidates(&s, &lines, &HashSet::new());
        prop_assert_eq!(items.len(), lines.len());

        for (item, matched) in items.iter_mut().zip(pattern.iter()) {
            item.status = if *matched { ItemStatus::Matched } else { ItemStatus::Unmatched };
        }
        let unmatched = items.iter().filter(|i| i.status == ItemStatus::Unmatched).count() as u64;

        match ReconciliationService::finalize(&s, &items) {
            Ok(finalized) => {
                prop_assert_eq!(unmatched, 0);
                prop_assert_eq!(finalized.status, SessionStatus::Finalized);
            }
            Err(ReconciliationError::UnreconciledItems { count }) => prop_assert_eq!(count, unmatched),
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// **Property 9.2: Matched plus unmatched covers every item**
    #[test]
    fn prop_summary_partitions_items(lines in arb_lines(LedgerId::new()), split in 0usize..20) {
        let s = session(lines[0].ledger_id);
        let mut items = ReconciliationService::candidates(&s, &lines, &HashSet::new());
        for item in items.iter_mut().take(split) {
            item.status = ItemStatus::Matched;
        }

        let summary = ReconciliationService::summary(&s, Decimal::ZERO, &items);
        let net: Decimal = lines.iter().map(|l| l.debit - l.credit).sum();
        prop_assert_eq!(summary.matched_total + summary.unmatched_total, net);
        prop_assert_eq!(summary.matched_count + summary.unmatched_count, items.len() as u64);
    }
}
