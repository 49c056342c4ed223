//! Accounting year error types.

use chrono::NaiveDate;
use devalaya_shared::types::AccountingYearId;
use thiserror::Error;

use super::year::YearStatus;

/// Errors that can occur while managing accounting years.
#[derive(Debug, Error)]
pub enum FiscalError {
    /// Start date must be before end date.
    #[error("Start date {start} must be before end date {end}")]
    InvalidDateRange {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },

    /// The requested range overlaps an existing year.
    #[error("Accounting year overlaps with existing year: {0}")]
    OverlappingYear(String),

    /// Accounting year not found.
    #[error("Accounting year not found: {0}")]
    YearNotFound(AccountingYearId),

    /// A closed year cannot become the active year.
    #[error("Accounting year {0} is closed and cannot be activated")]
    CannotActivateClosed(AccountingYearId),

    /// Out-of-order status transition.
    #[error("Invalid accounting year transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: YearStatus,
        /// The attempted target status.
        to: YearStatus,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl FiscalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::OverlappingYear(_) => "OVERLAPPING_YEAR",
            Self::YearNotFound(_) => "YEAR_NOT_FOUND",
            Self::CannotActivateClosed(_) => "CANNOT_ACTIVATE_CLOSED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidDateRange { .. } => 400,
            Self::YearNotFound(_) => 404,
            Self::OverlappingYear(_)
            | Self::CannotActivateClosed(_)
            | Self::InvalidTransition { .. } => 409,
            Self::Database(_) => 500,
        }
    }
}
