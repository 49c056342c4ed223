//! Kind-specific ledger rules.
//!
//! Each [`EntryKind`] maps to one validator function. The validators only see
//! lines that already passed the structural and ledger checks.

use super::error::LedgerError;
use super::types::{EntryKind, PostEntryInput, ResolvedLine, Side};
use crate::chart::types::LedgerType;

/// What a kind validator gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct KindContext<'a> {
    /// The posting request.
    pub input: &'a PostEntryInput,
    /// Lines resolved against their ledgers.
    pub lines: &'a [ResolvedLine],
}

/// A kind validator.
pub type KindValidator = fn(&KindContext<'_>) -> Result<(), LedgerError>;

impl EntryKind {
    /// Returns the validator for this kind.
    #[must_use]
    pub fn validator(self) -> KindValidator {
        match self {
            Self::Receipt => validate_receipt,
            Self::Payment => validate_payment,
            Self::Journal => validate_journal,
            Self::Contra => validate_contra,
            Self::CreditNote => validate_credit_note,
            Self::DebitNote => validate_debit_note,
            Self::InventoryJournal => validate_inventory_journal,
        }
    }
}

/// Runs the validator of the entry's kind.
pub fn validate_kind(ctx: &KindContext<'_>) -> Result<(), LedgerError> {
    (ctx.input.kind.validator())(ctx)
}

/// Money side must be bank/cash, the other side must not be.
fn validate_money_flow(ctx: &KindContext<'_>, money_side: Side) -> Result<(), LedgerError> {
    let kind = ctx.input.kind;
    for line in ctx.lines {
        let is_money = line.ledger_type.is_bank_or_cash();
        if (line.side == money_side) != is_money {
            return Err(LedgerError::LedgerTypeNotAllowed {
                kind,
                line: line.line_no,
                ledger_type: line.ledger_type,
            });
        }
    }
    Ok(())
}

/// Debits bank/cash, credits income or other non-money ledgers.
fn validate_receipt(ctx: &KindContext<'_>) -> Result<(), LedgerError> {
    validate_money_flow(ctx, Side::Debit)
}

/// Credits bank/cash, debits expense, payable, or other non-money ledgers.
fn validate_payment(ctx: &KindContext<'_>) -> Result<(), LedgerError> {
    validate_money_flow(ctx, Side::Credit)
}

fn validate_journal(ctx: &KindContext<'_>) -> Result<(), LedgerError> {
    for line in ctx.lines {
        let blank = line.narration.as_deref().is_none_or(|n| n.trim().is_empty());
        if blank {
            return Err(LedgerError::NarrationRequired { line: line.line_no });
        }
    }
    Ok(())
}

fn validate_contra(ctx: &KindContext<'_>) -> Result<(), LedgerError> {
    match ctx.lines.iter().find(|l| !l.ledger_type.is_bank_or_cash()) {
        Some(line) => Err(LedgerError::LedgerTypeNotAllowed {
            kind: EntryKind::Contra,
            line: line.line_no,
            ledger_type: line.ledger_type,
        }),
        None => Ok(()),
    }
}

fn validate_note(ctx: &KindContext<'_>, party_side: Side, requirement: &'static str) -> Result<(), LedgerError> {
    let kind = ctx.input.kind;
    let has_reference = ctx
        .input
        .original_reference
        .as_deref()
        .is_some_and(|r| !r.trim().is_empty());
    if !has_reference {
        return Err(LedgerError::OriginalReferenceRequired(kind));
    }

    if ctx
        .lines
        .iter()
        .any(|l| l.side == party_side && l.ledger_type.is_party())
    {
        Ok(())
    } else {
        Err(LedgerError::MissingRequiredLedger { kind, requirement })
    }
}

fn validate_credit_note(ctx: &KindContext<'_>) -> Result<(), LedgerError> {
    validate_note(ctx, Side::Credit, "a credit line on a receivable or payable ledger")
}

fn validate_debit_note(ctx: &KindContext<'_>) -> Result<(), LedgerError> {
    validate_note(ctx, Side::Debit, "a debit line on a receivable or payable ledger")
}

/// Valuation figures are trusted as supplied; only the ledger class is checked.
fn validate_inventory_journal(ctx: &KindContext<'_>) -> Result<(), LedgerError> {
    if ctx.lines.iter().any(|l| l.ledger_type == LedgerType::Inventory) {
        Ok(())
    } else {
        Err(LedgerError::MissingRequiredLedger {
            kind: EntryKind::InventoryJournal,
            requirement: "at least one line on an INVENTORY ledger",
        })
    }
}
