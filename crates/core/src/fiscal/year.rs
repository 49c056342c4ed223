//! Accounting year types.

use chrono::NaiveDate;
use devalaya_shared::types::AccountingYearId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an accounting year.
///
/// `Open → Closing → Closed`, one-way. `Closing` exists only while year-end
/// execution is running (or was interrupted) and already blocks postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum YearStatus {
    /// Entries may be posted.
    Open,
    /// Year-end closing is in progress.
    Closing,
    /// Closed for good.
    Closed,
}

impl YearStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "CLOSING" => Some(Self::Closing),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Returns true if entries may be posted or cancelled in this state.
    #[must_use]
    pub fn allows_posting(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for YearStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fiscal period entries are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingYear {
    /// Unique identifier.
    pub id: AccountingYearId,
    /// Display name (e.g., "FY 2026-27").
    pub name: String,
    /// First day of the year (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the year (inclusive).
    pub end_date: NaiveDate,
    /// Lifecycle status.
    pub status: YearStatus,
    /// Whether this is the temple's active year.
    pub is_active: bool,
}

impl AccountingYear {
    /// Returns true if the given date falls within this year.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns true if the other year's range intersects this one.
    #[must_use]
    pub fn overlaps(&self, start_date: NaiveDate, end_date: NaiveDate) -> bool {
        self.start_date <= end_date && self.end_date >= start_date
    }
}
