//! Year-end closing types.

use devalaya_shared::types::{AccountingYearId, LedgerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chart::types::AccountNature;
use crate::fiscal::YearStatus;

/// A condition blocking year-end execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosingIssue {
    /// The year is not OPEN.
    YearNotOpen {
        /// Current status.
        status: YearStatus,
    },
    /// Entries still awaiting a decision.
    PendingEntries {
        /// Number of PENDING entries in the year.
        count: u64,
    },
    /// A bank or cash ledger without a FINALIZED or LOCKED reconciliation.
    UnreconciledBankLedger {
        /// The ledger.
        ledger_id: LedgerId,
        /// Its code, for display.
        code: String,
    },
    /// No accounting year follows this one to receive the balances.
    NextYearMissing,
}

impl ClosingIssue {
    /// Returns the issue code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::YearNotOpen { .. } => "YEAR_NOT_OPEN",
            Self::PendingEntries { .. } => "PENDING_ENTRIES",
            Self::UnreconciledBankLedger { .. } => "UNRECONCILED_BANK_LEDGER",
            Self::NextYearMissing => "NEXT_YEAR_MISSING",
        }
    }
}

impl fmt::Display for ClosingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YearNotOpen { status } => write!(f, "Accounting year is {status}"),
            Self::PendingEntries { count } => write!(f, "{count} entries are still pending"),
            Self::UnreconciledBankLedger { code, .. } => write!(f, "Bank ledger {code} is not reconciled"),
            Self::NextYearMissing => write!(f, "No accounting year follows this one"),
        }
    }
}

/// What the closing checklist looks at.
#[derive(Debug, Clone)]
pub struct ClosingFacts {
    /// Year being closed.
    pub year_id: AccountingYearId,
    /// Its status.
    pub year_status: YearStatus,
    /// PENDING entries in the year.
    pub pending_entries: u64,
    /// Every active bank or cash ledger, with its code.
    pub bank_ledgers: Vec<(LedgerId, String)>,
    /// Bank ledgers with a FINALIZED or LOCKED session in the year.
    pub reconciled_ledgers: Vec<LedgerId>,
    /// The year receiving the balances.
    pub next_year_id: Option<AccountingYearId>,
}

/// Result of the closing checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosingValidation {
    /// Year being closed.
    pub year_id: AccountingYearId,
    /// Blocking issues; empty when the year may be closed.
    pub issues: Vec<ClosingIssue>,
    /// Number of checklist items.
    pub checks_total: u32,
    /// Number of passed checklist items.
    pub checks_passed: u32,
}

impl ClosingValidation {
    /// True when nothing blocks execution.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Closing figure of one ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerClosingFigure {
    /// The ledger.
    pub ledger_id: LedgerId,
    /// Its nature.
    pub nature: AccountNature,
    /// Balance at year end, in the normal direction.
    pub closing_balance: Decimal,
    /// Amount opening the next year.
    pub carried_forward: Decimal,
}

/// Figures for a whole year-end run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosingPlan {
    /// Year being closed.
    pub year_id: AccountingYearId,
    /// Year receiving the balances.
    pub next_year_id: AccountingYearId,
    /// One figure per ledger, in input order.
    pub figures: Vec<LedgerClosingFigure>,
    /// Income minus expense for the year.
    pub surplus: Decimal,
    /// Ledger the surplus was moved into, if any.
    pub surplus_ledger_id: Option<LedgerId>,
}

/// Stored marker of a closed ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerClosing {
    /// Closed year.
    pub year_id: AccountingYearId,
    /// The ledger.
    pub ledger_id: LedgerId,
    /// Balance at year end.
    pub closing_balance: Decimal,
    /// Amount written as next-year opening.
    pub carried_forward: Decimal,
    /// Year receiving the opening.
    pub next_year_id: AccountingYearId,
}

/// Outcome of an `execute` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosingReport {
    /// Closed year.
    pub year_id: AccountingYearId,
    /// Ledgers closed by this run.
    pub ledgers_closed: u64,
    /// Ledgers skipped because an earlier run closed them.
    pub ledgers_skipped: u64,
    /// Final status.
    pub status: YearStatus,
}
