//! Bank reconciliation domain types.

use chrono::{DateTime, NaiveDate, Utc};
use devalaya_shared::types::{
    AccountingYearId, ActorId, EntryId, EntryLineId, LedgerId, ReconciliationId, ReconciliationItemId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reconciliation session status. Each step is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Items may be matched and adjusted.
    InProgress,
    /// Every item matched; the session is immutable.
    Finalized,
    /// Terminal; postings into the period are blocked.
    Locked,
}

impl SessionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Finalized => "FINALIZED",
            Self::Locked => "LOCKED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "IN_PROGRESS" => Some(Self::InProgress),
            "FINALIZED" => Some(Self::Finalized),
            "LOCKED" => Some(Self::Locked),
            _ => None,
        }
    }

    /// True once the session counts as reconciled for year-end closing.
    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        matches!(self, Self::Finalized | Self::Locked)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Match state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Found on the bank statement.
    Matched,
    /// Not (yet) found on the bank statement.
    Unmatched,
}

impl ItemStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "MATCHED",
            Self::Unmatched => "UNMATCHED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MATCHED" => Some(Self::Matched),
            "UNMATCHED" => Some(Self::Unmatched),
            _ => None,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reconciliation session for one bank ledger and statement period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSession {
    /// Session ID.
    pub id: ReconciliationId,
    /// Bank or cash ledger.
    pub ledger_id: LedgerId,
    /// Accounting year.
    pub year_id: AccountingYearId,
    /// First statement day (inclusive).
    pub period_from: NaiveDate,
    /// Last statement day (inclusive).
    pub period_to: NaiveDate,
    /// Closing balance printed on the bank statement.
    pub statement_balance: Decimal,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Who started the session.
    pub created_by: ActorId,
    /// When the session was finalized.
    pub finalized_at: Option<DateTime<Utc>>,
    /// Who locked the session.
    pub locked_by: Option<ActorId>,
}

/// One entry line under reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationItem {
    /// Item ID.
    pub id: ReconciliationItemId,
    /// Owning session.
    pub session_id: ReconciliationId,
    /// Entry of the line.
    pub entry_id: EntryId,
    /// The bank ledger line.
    pub line_id: EntryLineId,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Debit on the bank ledger.
    pub debit: Decimal,
    /// Credit on the bank ledger.
    pub credit: Decimal,
    /// Match state.
    pub status: ItemStatus,
    /// Date the line cleared on the statement.
    pub statement_date: Option<NaiveDate>,
    /// Statement reference (cheque or UTR number).
    pub statement_reference: Option<String>,
    /// Investigation note.
    pub note: Option<String>,
    /// True for the item recording an adjustment entry.
    pub is_adjustment: bool,
}

/// Input for starting a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionInput {
    /// Bank or cash ledger.
    pub ledger_id: LedgerId,
    /// Accounting year.
    pub year_id: AccountingYearId,
    /// First statement day.
    pub period_from: NaiveDate,
    /// Last statement day.
    pub period_to: NaiveDate,
    /// Closing balance printed on the statement.
    pub statement_balance: Decimal,
}

/// A match/unmatch instruction for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemUpdate {
    /// The item.
    pub item_id: ReconciliationItemId,
    /// New match state.
    pub status: ItemStatus,
    /// Date the line cleared, recorded on match.
    pub statement_date: Option<NaiveDate>,
    /// Statement reference, recorded on match.
    pub statement_reference: Option<String>,
}

/// Input for a true-up adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentInput {
    /// Ledger on the other side (bank charges, interest, and so on).
    pub contra_ledger_id: LedgerId,
    /// Adjustment date, inside the statement period.
    pub entry_date: NaiveDate,
    /// Narration for both lines.
    pub narration: String,
}

/// Book-versus-statement summary of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    /// Session ID.
    pub session_id: ReconciliationId,
    /// Ledger balance at the period end.
    pub book_balance: Decimal,
    /// Statement closing balance.
    pub statement_balance: Decimal,
    /// Statement minus book.
    pub variance: Decimal,
    /// Net of matched items (debit − credit).
    pub matched_total: Decimal,
    /// Net of unmatched items (debit − credit).
    pub unmatched_total: Decimal,
    /// Number of matched items.
    pub matched_count: u64,
    /// Number of unmatched items.
    pub unmatched_count: u64,
}
