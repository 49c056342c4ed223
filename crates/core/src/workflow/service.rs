//! Workflow service for entry state transitions.
//!
//! Every transition is checked against the current status and the actor's
//! capabilities. Nothing here touches storage; the repository applies the
//! returned [`WorkflowAction`] under a row lock.

use chrono::Utc;

use crate::actor::{Actor, Capability};
use crate::fiscal::YearStatus;
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{EntryStatus, WorkflowAction};
use devalaya_shared::types::AccountingYearId;

/// Stateless service for managing entry workflow transitions.
pub struct WorkflowService;

impl WorkflowService {
    /// Status a new entry is stored with.
    #[must_use]
    pub fn initial_status(actor: &Actor) -> EntryStatus {
        if actor.has(Capability::AutoApprove) {
            EntryStatus::Approved
        } else {
            EntryStatus::Pending
        }
    }

    /// Approve a pending entry.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::NotAuthorized` without `can_approve_entries`
    /// and `WorkflowError::InvalidTransition` unless the entry is PENDING.
    pub fn approve(current_status: EntryStatus, actor: &Actor, note: Option<String>) -> Result<WorkflowAction, WorkflowError> {
        Self::require(actor, Capability::ApproveEntries)?;

        match current_status {
            EntryStatus::Pending => Ok(WorkflowAction::Approve {
                new_status: EntryStatus::Approved,
                approved_by: actor.id,
                approved_at: Utc::now(),
                note,
            }),
            _ => Err(WorkflowError::InvalidTransition {
                from: current_status,
                to: EntryStatus::Approved,
            }),
        }
    }

    /// Reject a pending entry.
    ///
    /// # Errors
    ///
    /// Same as [`Self::approve`].
    pub fn reject(current_status: EntryStatus, actor: &Actor, note: Option<String>) -> Result<WorkflowAction, WorkflowError> {
        Self::require(actor, Capability::ApproveEntries)?;

        match current_status {
            EntryStatus::Pending => Ok(WorkflowAction::Reject {
                new_status: EntryStatus::Rejected,
                rejected_by: actor.id,
                rejected_at: Utc::now(),
                note,
            }),
            _ => Err(WorkflowError::InvalidTransition {
                from: current_status,
                to: EntryStatus::Rejected,
            }),
        }
    }

    /// Cancel an approved entry, reversing its balance effect.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::CancelReasonRequired` for a blank reason,
    /// `WorkflowError::NotAuthorized` without `can_approve_entries`,
    /// `WorkflowError::ClosedPeriod` unless the year is OPEN, and
    /// `WorkflowError::InvalidTransition` unless the entry is APPROVED.
    pub fn cancel(
        current_status: EntryStatus,
        actor: &Actor,
        year_id: AccountingYearId,
        year_status: YearStatus,
        reason: String,
    ) -> Result<WorkflowAction, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::CancelReasonRequired);
        }
        Self::require(actor, Capability::ApproveEntries)?;

        if current_status != EntryStatus::Approved {
            return Err(WorkflowError::InvalidTransition {
                from: current_status,
                to: EntryStatus::Cancelled,
            });
        }
        if !year_status.allows_posting() {
            return Err(WorkflowError::ClosedPeriod {
                year_id,
                status: year_status,
            });
        }

        Ok(WorkflowAction::Cancel {
            new_status: EntryStatus::Cancelled,
            cancelled_by: actor.id,
            cancelled_at: Utc::now(),
            reason,
        })
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: EntryStatus, to: EntryStatus) -> bool {
        matches!(
            (from, to),
            (EntryStatus::Pending, EntryStatus::Approved | EntryStatus::Rejected)
                | (EntryStatus::Approved, EntryStatus::Cancelled)
        )
    }

    fn require(actor: &Actor, capability: Capability) -> Result<(), WorkflowError> {
        if actor.has(capability) {
            Ok(())
        } else {
            Err(WorkflowError::NotAuthorized {
                actor: actor.id,
                capability,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devalaya_shared::types::ActorId;

    fn approver() -> Actor {
        Actor::accountant(ActorId::new())
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(WorkflowService::initial_status(&Actor::clerk(ActorId::new())), EntryStatus::Pending);
        assert_eq!(WorkflowService::initial_status(&Actor::system(ActorId::new())), EntryStatus::Approved);
    }

    #[test]
    fn test_approve_from_pending() {
        let actor = approver();
        let action = WorkflowService::approve(EntryStatus::Pending, &actor, Some("ok".to_string())).unwrap();
        assert_eq!(action.new_status(), EntryStatus::Approved);
        if let WorkflowAction::Approve { approved_by, .. } = action {
            assert_eq!(approved_by, actor.id);
        } else {
            panic!("expected Approve");
        }
    }

    #[test]
    fn test_approve_rejected_entry_fails_with_current_state() {
        let result = WorkflowService::approve(EntryStatus::Rejected, &approver(), None);
        assert!(matches!(
            result,
            Err(WorkflowError::InvalidTransition {
                from: EntryStatus::Rejected,
                to: EntryStatus::Approved
            })
        ));
    }

    #[test]
    fn test_clerk_cannot_approve() {
        let result = WorkflowService::approve(EntryStatus::Pending, &Actor::clerk(ActorId::new()), None);
        assert!(matches!(result, Err(WorkflowError::NotAuthorized { .. })));
    }

    #[test]
    fn test_reject_from_pending() {
        let action = WorkflowService::reject(EntryStatus::Pending, &approver(), None).unwrap();
        assert_eq!(action.new_status(), EntryStatus::Rejected);
    }

    #[test]
    fn test_cancel_rules() {
        let actor = approver();
        let year = AccountingYearId::new();

        let action = WorkflowService::cancel(EntryStatus::Approved, &actor, year, YearStatus::Open, "duplicate".to_string()).unwrap();
        assert_eq!(action.new_status(), EntryStatus::Cancelled);

        assert!(matches!(
            WorkflowService::cancel(EntryStatus::Approved, &actor, year, YearStatus::Closed, "late".to_string()),
            Err(WorkflowError::ClosedPeriod { .. })
        ));
        assert!(matches!(
            WorkflowService::cancel(EntryStatus::Pending, &actor, year, YearStatus::Open, "x".to_string()),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        assert!(matches!(
            WorkflowService::cancel(EntryStatus::Approved, &actor, year, YearStatus::Open, "  ".to_string()),
            Err(WorkflowError::CancelReasonRequired)
        ));
    }

    #[test]
    fn test_is_valid_transition() {
        assert!(WorkflowService::is_valid_transition(EntryStatus::Pending, EntryStatus::Approved));
        assert!(WorkflowService::is_valid_transition(EntryStatus::Pending, EntryStatus::Rejected));
        assert!(WorkflowService::is_valid_transition(EntryStatus::Approved, EntryStatus::Cancelled));
        assert!(!WorkflowService::is_valid_transition(EntryStatus::Rejected, EntryStatus::Approved));
        assert!(!WorkflowService::is_valid_transition(EntryStatus::Cancelled, EntryStatus::Approved));
        assert!(!WorkflowService::is_valid_transition(EntryStatus::Pending, EntryStatus::Cancelled));
    }
}
