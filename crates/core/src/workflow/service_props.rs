//! Property-based tests for `WorkflowService`.

use devalaya_shared::types::{AccountingYearId, ActorId};
use proptest::prelude::*;

use crate::actor::{Actor, Capabilities};
use crate::fiscal::YearStatus;
use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::EntryStatus;

/// Strategy for generating random `EntryStatus` values.
fn arb_status() -> impl Strategy<Value = EntryStatus> {
    prop::sample::select(EntryStatus::ALL.to_vec())
}

fn arb_year_status() -> impl Strategy<Value = YearStatus> {
    prop_oneof![Just(YearStatus::Open), Just(YearStatus::Closing), Just(YearStatus::Closed)]
}

/// Strategy for an actor with arbitrary capabilities.
fn arb_actor() -> impl Strategy<Value = Actor> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(a, c, l, auto)| Actor {
        id: ActorId::new(),
        capabilities: Capabilities {
            can_approve_entries: a,
            can_close_year: c,
            can_lock_reconciliation: l,
            auto_approve: auto,
        },
    })
}

fn arb_note() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[a-zA-Z0-9 ]{1,40}".prop_map(Some)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 7.1: Only listed transitions succeed**
    ///
    /// *For any* status and capable actor, approve and reject succeed exactly
    /// from PENDING and cancel exactly from APPROVED in an open year.
    #[test]
    fn prop_transitions_follow_state_machine(status in arb_status(), note in arb_note()) {
        let actor = Actor::accountant(ActorId::new());
        let year = AccountingYearId::new();

        let approved = WorkflowService::approve(status, &actor, note.clone());
        prop_assert_eq!(approved.is_ok(), status == EntryStatus::Pending);

        let rejected = WorkflowService::reject(status, &actor, note);
        prop_assert_eq!(rejected.is_ok(), status == EntryStatus::Pending);

        let cancelled = WorkflowService::cancel(status, &actor, year, YearStatus::Open, "reason".to_string());
        prop_assert_eq!(cancelled.is_ok(), status == EntryStatus::Approved);

        for result in [approved, rejected, cancelled] {
            match result {
                Ok(action) => {
                    prop_assert!(WorkflowService::is_valid_transition(status, action.new_status()));
                    prop_assert_eq!(action.required_status(), status);
                }
                Err(WorkflowError::InvalidTransition { from, .. }) => prop_assert_eq!(from, status),
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }

    /// **Property 7.2: Decisions require the approval capability**
    #[test]
    fn prop_decisions_require_capability(actor in arb_actor(), status in arb_status()) {
        let result = WorkflowService::approve(status, &actor, None);
        if !actor.capabilities.can_approve_entries {
            let is_not_authorized = matches!(result, Err(WorkflowError::NotAuthorized { .. }));
            prop_assert!(is_not_authorized);
        }
    }

    /// **Property 7.3: Cancellation needs an open year**
    #[test]
    fn prop_cancel_requires_open_year(year_status in arb_year_status()) {
        let actor = Actor::accountant(ActorId::new());
        let result = WorkflowService::cancel(
            EntryStatus::Approved,
            &actor,
            AccountingYearId::new(),
            year_status,
            "duplicate receipt".to_string(),
        );
        prop_assert_eq!(result.is_ok(), year_status == YearStatus::Open);
    }

    /// **Property 7.4: Terminal states accept nothing**
    #[test]
    fn prop_terminal_states_are_final(to in arb_status()) {
        for from in [EntryStatus::Rejected, EntryStatus::Cancelled] {
            prop_assert!(!WorkflowService::is_valid_transition(from, to));
        }
    }
}
