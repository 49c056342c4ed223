//! Property-based tests for the chart of accounts arena.

use std::collections::HashSet;

use devalaya_shared::types::GroupId;
use proptest::prelude::*;

use super::tree::ChartOfAccounts;
use super::types::{AccountGroup, AccountNature};

/// Builds a chart of `n` root groups of one nature.
fn flat_chart(n: usize) -> (ChartOfAccounts, Vec<GroupId>) {
    let mut chart = ChartOfAccounts::new();
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let group = AccountGroup {
            id: GroupId::new(),
            code: format!("G{i:03}"),
            name: format!("Group {i}"),
            parent_id: None,
            nature: AccountNature::Expense,
        };
        ids.push(group.id);
        chart.add_group(group).unwrap();
    }
    (chart, ids)
}

/// Strategy for a sequence of (child index, optional parent index) moves.
fn arb_moves(n: usize) -> impl Strategy<Value = Vec<(usize, Option<usize>)>> {
    prop::collection::vec((0..n, prop::option::of(0..n)), 1..60)
}

/// True if following parent links from `id` ever revisits a group.
fn has_cycle(chart: &ChartOfAccounts, id: GroupId) -> bool {
    let mut seen = HashSet::from([id]);
    let mut current = chart.group(id).and_then(|g| g.parent_id);
    while let Some(parent) = current {
        if !seen.insert(parent) {
            return true;
        }
        current = chart.group(parent).and_then(|g| g.parent_id);
    }
    false
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 2.1: The group graph stays a forest**
    ///
    /// *For any* sequence of move requests, accepted or rejected, no group
    /// ever becomes its own ancestor.
    #[test]
    fn prop_moves_never_create_cycles(moves in arb_moves(8)) {
        let (mut chart, ids) = flat_chart(8);

        for (child, parent) in moves {
            let _ = chart.move_group(ids[child], parent.map(|p| ids[p]));
            for id in &ids {
                prop_assert!(!has_cycle(&chart, *id));
            }
        }
    }

    /// **Property 2.2: Rejected moves leave the chart unchanged**
    ///
    /// *For any* move that fails, every group keeps its previous parent.
    #[test]
    fn prop_rejected_move_is_noop(moves in arb_moves(6)) {
        let (mut chart, ids) = flat_chart(6);

        for (child, parent) in moves {
            let before: Vec<Option<GroupId>> =
                ids.iter().map(|id| chart.group(*id).unwrap().parent_id).collect();
            if chart.move_group(ids[child], parent.map(|p| ids[p])).is_err() {
                let after: Vec<Option<GroupId>> =
                    ids.iter().map(|id| chart.group(*id).unwrap().parent_id).collect();
                prop_assert_eq!(before, after);
            }
        }
    }
}
