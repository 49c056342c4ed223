//! Entry domain types for posting and validation.
//!
//! Every entry kind shares the same balanced line skeleton; what differs is
//! the validator each kind selects in the `kinds` module.

use chrono::{DateTime, NaiveDate, Utc};
use devalaya_shared::types::{AccountingYearId, ActorId, EntryId, EntryLineId, LedgerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::budget::types::BudgetOverrunWarning;
use crate::chart::types::{AccountNature, LedgerType};
use crate::workflow::types::EntryStatus;

/// The seven entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Money received into bank or cash.
    Receipt,
    /// Money paid out of bank or cash.
    Payment,
    /// Adjustment with unrestricted ledgers and mandatory line narration.
    Journal,
    /// Transfer between the temple's own bank and cash ledgers.
    Contra,
    /// Credit against a receivable or payable, referencing the original document.
    CreditNote,
    /// Debit against a receivable or payable, referencing the original document.
    DebitNote,
    /// Stock valuation movement supplied by the inventory collaborator.
    InventoryJournal,
}

impl EntryKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 7] = [
        Self::Receipt,
        Self::Payment,
        Self::Journal,
        Self::Contra,
        Self::CreditNote,
        Self::DebitNote,
        Self::InventoryJournal,
    ];

    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "RECEIPT",
            Self::Payment => "PAYMENT",
            Self::Journal => "JOURNAL",
            Self::Contra => "CONTRA",
            Self::CreditNote => "CREDIT_NOTE",
            Self::DebitNote => "DEBIT_NOTE",
            Self::InventoryJournal => "INVENTORY_JOURNAL",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.to_uppercase();
        Self::ALL.into_iter().find(|k| k.as_str() == upper)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Side of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Debit line.
    Debit,
    /// Credit line.
    Credit,
}

/// Input for a single line of an entry.
///
/// Exactly one of `debit` and `credit` must be positive; the other stays zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryLineInput {
    /// The ledger to post to.
    pub ledger_id: LedgerId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Line narration.
    pub narration: Option<String>,
    /// Optional cost center.
    pub cost_center: Option<String>,
    /// Optional cheque or document number.
    pub reference_number: Option<String>,
}

impl EntryLineInput {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(ledger_id: LedgerId, amount: Decimal) -> Self {
        Self {
            ledger_id,
            debit: amount,
            credit: Decimal::ZERO,
            narration: None,
            cost_center: None,
            reference_number: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(ledger_id: LedgerId, amount: Decimal) -> Self {
        Self {
            ledger_id,
            debit: Decimal::ZERO,
            credit: amount,
            narration: None,
            cost_center: None,
            reference_number: None,
        }
    }

    /// Sets the line narration.
    #[must_use]
    pub fn with_narration(mut self, narration: impl Into<String>) -> Self {
        self.narration = Some(narration.into());
        self
    }
}

/// Input for posting an entry.
///
/// The target year is always explicit; nothing reads an implicit active year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEntryInput {
    /// Entry kind.
    pub kind: EntryKind,
    /// Accounting year the entry belongs to.
    pub year_id: AccountingYearId,
    /// Entry date, inside the year.
    pub entry_date: NaiveDate,
    /// Entry-level narration.
    pub narration: Option<String>,
    /// Originating document for credit and debit notes (informational).
    pub original_reference: Option<String>,
    /// Ordered lines.
    pub lines: Vec<EntryLineInput>,
}

/// A validated line resolved against its ledger.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLine {
    /// 1-based position within the entry.
    pub line_no: u32,
    /// The ledger.
    pub ledger_id: LedgerId,
    /// Ledger classification at posting time.
    pub ledger_type: LedgerType,
    /// Ledger nature at posting time.
    pub nature: AccountNature,
    /// Side of the line.
    pub side: Side,
    /// Positive amount.
    pub amount: Decimal,
    /// Line narration.
    pub narration: Option<String>,
    /// Optional cost center.
    pub cost_center: Option<String>,
    /// Optional cheque or document number.
    pub reference_number: Option<String>,
}

impl ResolvedLine {
    /// Debit amount, zero for credit lines.
    #[must_use]
    pub fn debit(&self) -> Decimal {
        match self.side {
            Side::Debit => self.amount,
            Side::Credit => Decimal::ZERO,
        }
    }

    /// Credit amount, zero for debit lines.
    #[must_use]
    pub fn credit(&self) -> Decimal {
        match self.side {
            Side::Debit => Decimal::ZERO,
            Side::Credit => self.amount,
        }
    }
}

/// Entry totals for validation and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryTotals {
    /// Sum of debit amounts.
    pub debit: Decimal,
    /// Sum of credit amounts.
    pub credit: Decimal,
    /// Whether the entry is balanced (exact equality, no tolerance).
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(debit: Decimal, credit: Decimal) -> Self {
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// A statement period locked by reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedPeriod {
    /// The bank ledger.
    pub ledger_id: LedgerId,
    /// First locked day (inclusive).
    pub from: NaiveDate,
    /// Last locked day (inclusive).
    pub to: NaiveDate,
}

impl LockedPeriod {
    /// Returns true if a posting to `ledger_id` on `date` falls inside the lock.
    #[must_use]
    pub fn covers(&self, ledger_id: LedgerId, date: NaiveDate) -> bool {
        self.ledger_id == ledger_id && date >= self.from && date <= self.to
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone)]
pub struct ValidatedEntry {
    /// Resolved lines in input order.
    pub lines: Vec<ResolvedLine>,
    /// Totals.
    pub totals: EntryTotals,
    /// Budget overruns detected under the warn policy.
    pub budget_warnings: Vec<BudgetOverrunWarning>,
}

/// Result returned to callers that post entries.
#[derive(Debug, Clone, Serialize)]
pub struct PostedEntry {
    /// The new entry.
    pub entry_id: EntryId,
    /// PENDING, or APPROVED for auto-approving actors.
    pub status: EntryStatus,
    /// Entry totals.
    pub totals: EntryTotals,
    /// Budget overruns the caller may acknowledge.
    pub budget_warnings: Vec<BudgetOverrunWarning>,
}

/// A stored entry line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryLine {
    /// Line ID.
    pub id: EntryLineId,
    /// 1-based position within the entry.
    pub line_no: u32,
    /// The ledger.
    pub ledger_id: LedgerId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Line narration.
    pub narration: Option<String>,
    /// Optional cost center.
    pub cost_center: Option<String>,
    /// Optional cheque or document number.
    pub reference_number: Option<String>,
}

/// A stored entry with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    /// Entry ID.
    pub id: EntryId,
    /// Entry kind.
    pub kind: EntryKind,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Accounting year.
    pub year_id: AccountingYearId,
    /// Workflow status.
    pub status: EntryStatus,
    /// Entry-level narration.
    pub narration: Option<String>,
    /// Originating document for notes.
    pub original_reference: Option<String>,
    /// Creator.
    pub created_by: ActorId,
    /// Approver, set once approved.
    pub approved_by: Option<ActorId>,
    /// Approval or rejection note.
    pub decision_note: Option<String>,
    /// When the entry was approved or rejected.
    pub decided_at: Option<DateTime<Utc>>,
    /// Entry this one replaces after an amendment.
    pub replaces: Option<EntryId>,
    /// Ordered lines.
    pub lines: Vec<EntryLine>,
}

impl Entry {
    /// Recomputes the entry totals from its lines.
    #[must_use]
    pub fn totals(&self) -> EntryTotals {
        EntryTotals::new(
            self.lines.iter().map(|l| l.debit).sum(),
            self.lines.iter().map(|l| l.credit).sum(),
        )
    }

    /// Ledgers touched by this entry, without duplicates.
    #[must_use]
    pub fn ledger_ids(&self) -> Vec<LedgerId> {
        let mut ids: Vec<LedgerId> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if !ids.contains(&line.ledger_id) {
                ids.push(line.ledger_id);
            }
        }
        ids
    }
}
