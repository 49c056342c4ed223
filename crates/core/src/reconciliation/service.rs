//! Reconciliation rules: session start, candidate lines, matching,
//! adjustment, finalize and lock.

use std::collections::HashSet;

use chrono::Utc;
use devalaya_shared::types::{EntryLineId, ReconciliationItemId};
use rust_decimal::Decimal;

use super::error::ReconciliationError;
use super::types::{
    AdjustmentInput, ItemStatus, ItemUpdate, ReconciliationItem, ReconciliationSession, ReconciliationSummary,
    SessionStatus, StartSessionInput,
};
use crate::actor::{Actor, Capability};
use crate::chart::types::Ledger;
use crate::fiscal::AccountingYear;
use crate::ledger::balance::ApprovedLine;
use crate::ledger::types::{EntryKind, EntryLineInput, LockedPeriod, PostEntryInput};

/// Stateless reconciliation service.
pub struct ReconciliationService;

impl ReconciliationService {
    /// Validates a new session.
    ///
    /// # Errors
    ///
    /// - `NotBankLedger` unless the ledger is BANK or CASH
    /// - `InvalidPeriod` for an empty period or one outside the year
    /// - `OverlappingSession` when another session of the ledger covers part of it
    pub fn validate_start(
        input: &StartSessionInput,
        ledger: &Ledger,
        year: &AccountingYear,
        existing: &[ReconciliationSession],
    ) -> Result<(), ReconciliationError> {
        if !ledger.ledger_type.is_bank_or_cash() {
            return Err(ReconciliationError::NotBankLedger {
                ledger_id: ledger.id,
                ledger_type: ledger.ledger_type,
            });
        }

        let in_year = year.contains_date(input.period_from) && year.contains_date(input.period_to);
        if input.period_from > input.period_to || !in_year || input.year_id != year.id {
            return Err(ReconciliationError::InvalidPeriod {
                from: input.period_from,
                to: input.period_to,
            });
        }

        if let Some(other) = existing.iter().find(|s| {
            s.ledger_id == input.ledger_id && s.period_from <= input.period_to && s.period_to >= input.period_from
        }) {
            return Err(ReconciliationError::OverlappingSession(other.id));
        }

        Ok(())
    }

    /// Approved lines of the session's ledger and period not yet in the session,
    /// as new unmatched items. Running it twice adds nothing the second time.
    #[must_use]
    pub fn candidates(
        session: &ReconciliationSession,
        lines: &[ApprovedLine],
        already_included: &HashSet<EntryLineId>,
    ) -> Vec<ReconciliationItem> {
        lines
            .iter()
            .filter(|l| l.ledger_id == session.ledger_id)
            .filter(|l| l.entry_date >= session.period_from && l.entry_date <= session.period_to)
            .filter(|l| !already_included.contains(&l.line_id))
            .map(|l| ReconciliationItem {
                id: ReconciliationItemId::new(),
                session_id: session.id,
                entry_id: l.entry_id,
                line_id: l.line_id,
                entry_date: l.entry_date,
                debit: l.debit,
                credit: l.credit,
                status: ItemStatus::Unmatched,
                statement_date: None,
                statement_reference: None,
                note: None,
                is_adjustment: false,
            })
            .collect()
    }

    /// Rejects changes to a session that is not IN_PROGRESS.
    ///
    /// # Errors
    ///
    /// Returns `ReconciliationError::SessionClosed`.
    pub fn ensure_in_progress(session: &ReconciliationSession) -> Result<(), ReconciliationError> {
        if session.status == SessionStatus::InProgress {
            Ok(())
        } else {
            Err(ReconciliationError::SessionClosed(session.status))
        }
    }

    /// Applies match/unmatch instructions to the session's items.
    ///
    /// All instructions are checked before any item changes.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` or `ItemNotFound`.
    pub fn apply_updates(
        session: &ReconciliationSession,
        items: &mut [ReconciliationItem],
        updates: &[ItemUpdate],
    ) -> Result<(), ReconciliationError> {
        Self::ensure_in_progress(session)?;

        if let Some(missing) = updates.iter().find(|u| !items.iter().any(|i| i.id == u.item_id)) {
            return Err(ReconciliationError::ItemNotFound(missing.item_id));
        }

        for update in updates {
            if let Some(item) = items.iter_mut().find(|i| i.id == update.item_id) {
                item.status = update.status;
                match update.status {
                    ItemStatus::Matched => {
                        item.statement_date = update.statement_date.or(Some(item.entry_date));
                        item.statement_reference.clone_from(&update.statement_reference);
                    }
                    ItemStatus::Unmatched => {
                        item.statement_date = None;
                        item.statement_reference = None;
                    }
                }
            }
        }
        Ok(())
    }

    /// Attaches an investigation note to an item.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` or `ItemNotFound`.
    pub fn add_note(
        session: &ReconciliationSession,
        items: &mut [ReconciliationItem],
        item_id: ReconciliationItemId,
        note: String,
    ) -> Result<(), ReconciliationError> {
        Self::ensure_in_progress(session)?;
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(ReconciliationError::ItemNotFound(item_id))?;
        item.note = Some(note);
        Ok(())
    }

    /// Book-versus-statement summary.
    #[must_use]
    pub fn summary(
        session: &ReconciliationSession,
        book_balance: Decimal,
        items: &[ReconciliationItem],
    ) -> ReconciliationSummary {
        let net = |status: ItemStatus| -> (Decimal, u64) {
            items
                .iter()
                .filter(|i| i.status == status)
                .fold((Decimal::ZERO, 0), |(sum, n), i| (sum + i.debit - i.credit, n + 1))
        };
        let (matched_total, matched_count) = net(ItemStatus::Matched);
        let (unmatched_total, unmatched_count) = net(ItemStatus::Unmatched);

        ReconciliationSummary {
            session_id: session.id,
            book_balance,
            statement_balance: session.statement_balance,
            variance: session.statement_balance - book_balance,
            matched_total,
            unmatched_total,
            matched_count,
            unmatched_count,
        }
    }

    /// The actor an adjustment journal is posted as.
    ///
    /// Someone who may approve entries gets the adjustment stored APPROVED
    /// straight away; anyone else posts it PENDING like any other entry.
    #[must_use]
    pub fn adjustment_poster(actor: &Actor) -> Actor {
        if actor.has(Capability::ApproveEntries) {
            Actor::system(actor.id)
        } else {
            *actor
        }
    }

    /// Builds the Journal that trues the bank ledger up to the statement.
    ///
    /// A positive variance (statement above book) debits the bank ledger; a
    /// negative one credits it.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed`, `InvalidPeriod` for a date outside the
    /// statement period, or `NothingToAdjust` when there is no variance.
    pub fn build_adjustment(
        session: &ReconciliationSession,
        book_balance: Decimal,
        input: &AdjustmentInput,
    ) -> Result<PostEntryInput, ReconciliationError> {
        Self::ensure_in_progress(session)?;

        if input.entry_date < session.period_from || input.entry_date > session.period_to {
            return Err(ReconciliationError::InvalidPeriod {
                from: session.period_from,
                to: session.period_to,
            });
        }

        let variance = session.statement_balance - book_balance;
        if variance.is_zero() {
            return Err(ReconciliationError::NothingToAdjust);
        }

        let amount = variance.abs();
        let (bank_line, contra_line) = if variance.is_sign_positive() {
            (
                EntryLineInput::debit(session.ledger_id, amount),
                EntryLineInput::credit(input.contra_ledger_id, amount),
            )
        } else {
            (
                EntryLineInput::credit(session.ledger_id, amount),
                EntryLineInput::debit(input.contra_ledger_id, amount),
            )
        };

        Ok(PostEntryInput {
            kind: EntryKind::Journal,
            year_id: session.year_id,
            entry_date: input.entry_date,
            narration: Some(input.narration.clone()),
            original_reference: None,
            lines: vec![
                bank_line.with_narration(input.narration.clone()),
                contra_line.with_narration(input.narration.clone()),
            ],
        })
    }

    /// Finalizes a session with every item matched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless IN_PROGRESS and `UnreconciledItems`
    /// when any item is unmatched.
    pub fn finalize(
        session: &ReconciliationSession,
        items: &[ReconciliationItem],
    ) -> Result<ReconciliationSession, ReconciliationError> {
        if session.status != SessionStatus::InProgress {
            return Err(ReconciliationError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Finalized,
            });
        }

        let unmatched = items.iter().filter(|i| i.status == ItemStatus::Unmatched).count() as u64;
        if unmatched > 0 {
            return Err(ReconciliationError::UnreconciledItems { count: unmatched });
        }

        Ok(ReconciliationSession {
            status: SessionStatus::Finalized,
            finalized_at: Some(Utc::now()),
            ..session.clone()
        })
    }

    /// Locks a finalized session.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` without `can_lock_reconciliation` and
    /// `InvalidTransition` unless FINALIZED.
    pub fn lock(session: &ReconciliationSession, actor: &Actor) -> Result<ReconciliationSession, ReconciliationError> {
        if !actor.has(Capability::LockReconciliation) {
            return Err(ReconciliationError::NotAuthorized {
                actor: actor.id,
                capability: Capability::LockReconciliation,
            });
        }
        if session.status != SessionStatus::Finalized {
            return Err(ReconciliationError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Locked,
            });
        }

        Ok(ReconciliationSession {
            status: SessionStatus::Locked,
            locked_by: Some(actor.id),
            ..session.clone()
        })
    }

    /// The period a locked session blocks postings into.
    #[must_use]
    pub fn locked_period(session: &ReconciliationSession) -> Option<LockedPeriod> {
        (session.status == SessionStatus::Locked).then_some(LockedPeriod {
            ledger_id: session.ledger_id,
            from: session.period_from,
            to: session.period_to,
        })
    }
}
