//! Accounting year rules.

use chrono::NaiveDate;

use super::error::FiscalError;
use super::year::{AccountingYear, YearStatus};

/// Stateless service holding the accounting year rules.
pub struct YearService;

impl YearService {
    /// Validates that `start_date` is strictly before `end_date`.
    pub fn validate_date_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), FiscalError> {
        if start_date >= end_date {
            return Err(FiscalError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        Ok(())
    }

    /// Checks a candidate range against every existing year of the temple,
    /// not only the active one.
    pub fn check_overlap(
        start_date: NaiveDate,
        end_date: NaiveDate,
        existing: &[AccountingYear],
    ) -> Result<(), FiscalError> {
        Self::validate_date_range(start_date, end_date)?;

        match existing.iter().find(|y| y.overlaps(start_date, end_date)) {
            Some(year) => Err(FiscalError::OverlappingYear(year.name.clone())),
            None => Ok(()),
        }
    }

    /// Checks that a year may become the active year.
    ///
    /// Switching the active year never closes the previous one.
    pub fn ensure_activatable(year: &AccountingYear) -> Result<(), FiscalError> {
        if year.status == YearStatus::Closed {
            return Err(FiscalError::CannotActivateClosed(year.id));
        }
        Ok(())
    }

    /// Returns the year receiving carry-forward balances: the earliest year
    /// starting after `year` ends.
    #[must_use]
    pub fn next_year<'a>(
        year: &AccountingYear,
        years: &'a [AccountingYear],
    ) -> Option<&'a AccountingYear> {
        years
            .iter()
            .filter(|y| y.start_date > year.end_date)
            .min_by_key(|y| y.start_date)
    }

    /// Enters (or resumes) year-end closing.
    ///
    /// `Open → Closing` starts a closing run and `Closing → Closing` resumes an
    /// interrupted one. A closed year is rejected with its current state.
    pub fn begin_closing(current: YearStatus) -> Result<YearStatus, FiscalError> {
        match current {
            YearStatus::Open | YearStatus::Closing => Ok(YearStatus::Closing),
            YearStatus::Closed => Err(FiscalError::InvalidTransition {
                from: current,
                to: YearStatus::Closing,
            }),
        }
    }

    /// Completes year-end closing.
    pub fn finish_closing(current: YearStatus) -> Result<YearStatus, FiscalError> {
        match current {
            YearStatus::Closing => Ok(YearStatus::Closed),
            _ => Err(FiscalError::InvalidTransition {
                from: current,
                to: YearStatus::Closed,
            }),
        }
    }
}
