//! Ledger error types for entry validation and state errors.
//!
//! Validation errors reject an entry synchronously with nothing persisted.

use chrono::NaiveDate;
use devalaya_shared::types::{AccountingYearId, EntryId, LedgerId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::EntryKind;
use crate::chart::types::LedgerType;
use crate::fiscal::YearStatus;
use crate::workflow::types::EntryStatus;

/// Errors that can occur during entry operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 lines.
    #[error("Entry must have at least 2 lines")]
    InsufficientLines,

    /// Entry is not balanced (debits != credits).
    #[error("Entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Line amount cannot be zero.
    #[error("Line {line}: amount cannot be zero")]
    ZeroAmount {
        /// 1-based line number.
        line: u32,
    },

    /// Line amount cannot be negative.
    #[error("Line {line}: amount cannot be negative")]
    NegativeAmount {
        /// 1-based line number.
        line: u32,
    },

    /// Line amount carries more decimal places than the ledger stores.
    #[error("Line {line}: amount has {scale} decimal places, at most {max} allowed")]
    TooManyDecimals {
        /// 1-based line number.
        line: u32,
        /// Scale of the offending amount.
        scale: u32,
        /// Largest accepted scale.
        max: u32,
    },

    /// Line must specify either debit or credit, not both.
    #[error("Line {line}: specify either debit or credit, not both")]
    BothSides {
        /// 1-based line number.
        line: u32,
    },

    /// Entry date falls outside the accounting year.
    #[error("Entry date {date} is outside the accounting year ({start} to {end})")]
    DateOutsideYear {
        /// The entry date.
        date: NaiveDate,
        /// Year start.
        start: NaiveDate,
        /// Year end.
        end: NaiveDate,
    },

    /// Ledger not found.
    #[error("Ledger not found: {0}")]
    LedgerNotFound(LedgerId),

    /// Ledger is inactive and cannot be used.
    #[error("Ledger {0} is inactive")]
    LedgerInactive(LedgerId),

    /// Ledger type not allowed on this side of this kind.
    #[error("Line {line}: {ledger_type} ledger not allowed here in a {kind} entry")]
    LedgerTypeNotAllowed {
        /// Entry kind.
        kind: EntryKind,
        /// 1-based line number.
        line: u32,
        /// Offending ledger type.
        ledger_type: LedgerType,
    },

    /// The kind requires a line on a particular ledger class.
    #[error("{kind} entry requires {requirement}")]
    MissingRequiredLedger {
        /// Entry kind.
        kind: EntryKind,
        /// What is missing.
        requirement: &'static str,
    },

    /// Journal lines need a narration.
    #[error("Line {line}: narration is required for journal entries")]
    NarrationRequired {
        /// 1-based line number.
        line: u32,
    },

    /// Credit and debit notes need the originating document reference.
    #[error("{0} entry requires an original reference")]
    OriginalReferenceRequired(EntryKind),

    // ========== Period Errors ==========
    /// Posting into a year that is not open.
    #[error("Accounting year {year_id} is {status}, no posting allowed")]
    ClosedPeriod {
        /// The year.
        year_id: AccountingYearId,
        /// Its current status.
        status: YearStatus,
    },

    /// Posting into a bank period locked by reconciliation.
    #[error("Ledger {ledger_id} is locked by reconciliation on {date}")]
    PeriodLocked {
        /// The bank ledger.
        ledger_id: LedgerId,
        /// The entry date.
        date: NaiveDate,
    },

    /// Accounting year not found.
    #[error("Accounting year not found: {0}")]
    YearNotFound(AccountingYearId),

    // ========== Budget Errors ==========
    /// Budget exceeded under the strict policy.
    #[error("Budget exceeded on ledger {ledger_id} by {overrun}")]
    BudgetOverrun {
        /// The expense ledger.
        ledger_id: LedgerId,
        /// Amount above the allocation.
        overrun: Decimal,
    },

    // ========== Entry State Errors ==========
    /// Entry not found.
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Only pending entries can be edited or deleted.
    #[error("Entry is {status}; only pending entries can be edited or deleted")]
    NotEditable {
        /// Current status.
        status: EntryStatus,
    },

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRY",
            Self::ZeroAmount { .. } => "ZERO_AMOUNT",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::TooManyDecimals { .. } => "TOO_MANY_DECIMALS",
            Self::BothSides { .. } => "BOTH_SIDES",
            Self::DateOutsideYear { .. } => "DATE_OUTSIDE_YEAR",
            Self::LedgerNotFound(_) => "LEDGER_NOT_FOUND",
            Self::LedgerInactive(_) => "LEDGER_INACTIVE",
            Self::LedgerTypeNotAllowed { .. } => "LEDGER_TYPE_NOT_ALLOWED",
            Self::MissingRequiredLedger { .. } => "MISSING_REQUIRED_LEDGER",
            Self::NarrationRequired { .. } => "NARRATION_REQUIRED",
            Self::OriginalReferenceRequired(_) => "ORIGINAL_REFERENCE_REQUIRED",
            Self::ClosedPeriod { .. } => "CLOSED_PERIOD",
            Self::PeriodLocked { .. } => "PERIOD_LOCKED",
            Self::YearNotFound(_) => "YEAR_NOT_FOUND",
            Self::BudgetOverrun { .. } => "BUDGET_OVERRUN",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::NotEditable { .. } => "NOT_EDITABLE",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InsufficientLines
            | Self::Unbalanced { .. }
            | Self::ZeroAmount { .. }
            | Self::NegativeAmount { .. }
            | Self::TooManyDecimals { .. }
            | Self::BothSides { .. }
            | Self::DateOutsideYear { .. }
            | Self::LedgerInactive(_)
            | Self::LedgerTypeNotAllowed { .. }
            | Self::MissingRequiredLedger { .. }
            | Self::NarrationRequired { .. }
            | Self::OriginalReferenceRequired(_) => 400,

            // 404 Not Found
            Self::LedgerNotFound(_) | Self::YearNotFound(_) | Self::EntryNotFound(_) => 404,

            // 409 Conflict - period and state errors
            Self::ClosedPeriod { .. } | Self::PeriodLocked { .. } | Self::NotEditable { .. } => 409,

            // 422 - strict budget policy
            Self::BudgetOverrun { .. } => 422,

            // 500 Internal Server Error
            Self::Database(_) => 500,
        }
    }

    /// True for the structural validation failures (nothing was persisted).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.status_code() == 400 || matches!(self, Self::LedgerNotFound(_))
    }
}
