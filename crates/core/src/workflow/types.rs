//! Workflow domain types for the entry approval lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use devalaya_shared::types::{AccountingYearId, ActorId, LedgerId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::types::EntryKind;

/// Entry status in the approval workflow.
///
/// The valid transitions are:
/// - Pending → Approved (approve)
/// - Pending → Rejected (reject)
/// - Approved → Cancelled (cancel, while the year is open)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// Awaiting a decision; excluded from balances.
    Pending,
    /// Authoritative; included in balances.
    Approved,
    /// Declined; never affects balances.
    Rejected,
    /// Approved and later withdrawn; its balance effect is reversed.
    Cancelled,
}

impl EntryStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Approved, Self::Rejected, Self::Cancelled];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if the entry can be modified or deleted.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if the entry contributes to balances.
    #[must_use]
    pub fn affects_balances(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workflow action representing a state transition with audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Approve a pending entry.
    Approve {
        /// The new status after approval.
        new_status: EntryStatus,
        /// The approver.
        approved_by: ActorId,
        /// When the entry was approved.
        approved_at: DateTime<Utc>,
        /// Optional note from the approver.
        note: Option<String>,
    },
    /// Reject a pending entry.
    Reject {
        /// The new status after rejection.
        new_status: EntryStatus,
        /// The actor who rejected.
        rejected_by: ActorId,
        /// When the entry was rejected.
        rejected_at: DateTime<Utc>,
        /// Optional note.
        note: Option<String>,
    },
    /// Cancel an approved entry.
    Cancel {
        /// The new status after cancellation.
        new_status: EntryStatus,
        /// The actor who cancelled.
        cancelled_by: ActorId,
        /// When the entry was cancelled.
        cancelled_at: DateTime<Utc>,
        /// Why the entry was cancelled.
        reason: String,
    },
}

impl WorkflowAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> EntryStatus {
        match self {
            Self::Approve { new_status, .. } | Self::Reject { new_status, .. } | Self::Cancel { new_status, .. } => {
                *new_status
            }
        }
    }

    /// Status the entry must hold for this action.
    #[must_use]
    pub fn required_status(&self) -> EntryStatus {
        match self {
            Self::Approve { .. } | Self::Reject { .. } => EntryStatus::Pending,
            Self::Cancel { .. } => EntryStatus::Approved,
        }
    }
}

/// Filter for listing entries. Every field is optional and combined with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Only entries in this status.
    pub status: Option<EntryStatus>,
    /// Only entries of this kind.
    pub kind: Option<EntryKind>,
    /// Only entries with a line on this ledger.
    pub ledger_id: Option<LedgerId>,
    /// Only entries dated on or after this day.
    pub from: Option<NaiveDate>,
    /// Only entries dated on or before this day.
    pub to: Option<NaiveDate>,
    /// Only entries in this accounting year.
    pub year_id: Option<AccountingYearId>,
}

/// Per-status entry counts for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStats {
    /// Pending entries.
    pub pending: u64,
    /// Approved entries.
    pub approved: u64,
    /// Rejected entries.
    pub rejected: u64,
    /// Cancelled entries.
    pub cancelled: u64,
}

impl ApprovalStats {
    /// Adds `count` entries of `status`.
    pub fn add(&mut self, status: EntryStatus, count: u64) {
        match status {
            EntryStatus::Pending => self.pending += count,
            EntryStatus::Approved => self.approved += count,
            EntryStatus::Rejected => self.rejected += count,
            EntryStatus::Cancelled => self.cancelled += count,
        }
    }

    /// Total number of entries.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected + self.cancelled
    }
}
