//! Structural validation of entry lines: shape and balance.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{EntryLineInput, EntryTotals, Side};

/// Decimal places stored for every amount column.
pub const MAX_AMOUNT_SCALE: u32 = 4;

/// Determines the side and amount of a line.
///
/// Exactly one of debit and credit must be positive, and neither may carry
/// more than [`MAX_AMOUNT_SCALE`] decimal places.
pub fn line_side(line_no: u32, line: &EntryLineInput) -> Result<(Side, Decimal), LedgerError> {
    if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount { line: line_no });
    }

    // Trailing zeros are harmless; 10.50000 is stored as 10.5000.
    for amount in [line.debit, line.credit] {
        let scale = amount.normalize().scale();
        if scale > MAX_AMOUNT_SCALE {
            return Err(LedgerError::TooManyDecimals {
                line: line_no,
                scale,
                max: MAX_AMOUNT_SCALE,
            });
        }
    }

    match (line.debit > Decimal::ZERO, line.credit > Decimal::ZERO) {
        (true, false) => Ok((Side::Debit, line.debit)),
        (false, true) => Ok((Side::Credit, line.credit)),
        (true, true) => Err(LedgerError::BothSides { line: line_no }),
        (false, false) => Err(LedgerError::ZeroAmount { line: line_no }),
    }
}

/// Validates that a set of lines is well formed and balanced.
///
/// Checks, in order: at least two lines, every line one-sided and positive,
/// then Σdebit == Σcredit with exact decimal equality.
pub fn validate_lines(lines: &[EntryLineInput]) -> Result<EntryTotals, LedgerError> {
    if lines.len() < 2 {
        return Err(LedgerError::InsufficientLines);
    }

    let mut total_debit = Decimal::ZERO;
    let mut total_credit = Decimal::ZERO;

    for (line_no, line) in (1u32..).zip(lines) {
        match line_side(line_no, line)? {
            (Side::Debit, amount) => total_debit += amount,
            (Side::Credit, amount) => total_credit += amount,
        }
    }

    let totals = EntryTotals::new(total_debit, total_credit);
    if !totals.is_balanced {
        return Err(LedgerError::Unbalanced {
            debit: total_debit,
            credit: total_credit,
        });
    }

    Ok(totals)
}
