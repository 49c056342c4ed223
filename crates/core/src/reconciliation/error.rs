//! Reconciliation error types.

use chrono::NaiveDate;
use devalaya_shared::types::{ActorId, LedgerId, ReconciliationId, ReconciliationItemId};
use thiserror::Error;

use super::types::SessionStatus;
use crate::actor::Capability;
use crate::chart::types::LedgerType;
use crate::ledger::error::LedgerError;

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// Session not found.
    #[error("Reconciliation session not found: {0}")]
    SessionNotFound(ReconciliationId),

    /// Item not found in the session.
    #[error("Reconciliation item not found: {0}")]
    ItemNotFound(ReconciliationItemId),

    /// Ledger not found.
    #[error("Ledger not found: {0}")]
    LedgerNotFound(LedgerId),

    /// Only bank and cash ledgers are reconciled.
    #[error("Ledger {ledger_id} is {ledger_type}; only BANK and CASH ledgers can be reconciled")]
    NotBankLedger {
        /// The ledger.
        ledger_id: LedgerId,
        /// Its type.
        ledger_type: LedgerType,
    },

    /// Statement period is empty or outside the accounting year.
    #[error("Statement period {from} to {to} is invalid for this accounting year")]
    InvalidPeriod {
        /// Period start.
        from: NaiveDate,
        /// Period end.
        to: NaiveDate,
    },

    /// Another session already covers part of the period.
    #[error("Statement period overlaps session {0}")]
    OverlappingSession(ReconciliationId),

    /// The session no longer accepts changes.
    #[error("Session is {0}; only IN_PROGRESS sessions can be changed")]
    SessionClosed(SessionStatus),

    /// Out-of-order session transition.
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: SessionStatus,
        /// Requested status.
        to: SessionStatus,
    },

    /// Finalize attempted with unmatched items.
    #[error("{count} item(s) are still unmatched")]
    UnreconciledItems {
        /// Number of unmatched items.
        count: u64,
    },

    /// The actor lacks the capability.
    #[error("Actor {actor} lacks capability {capability}")]
    NotAuthorized {
        /// The actor.
        actor: ActorId,
        /// The missing capability.
        capability: Capability,
    },

    /// Book and statement already agree.
    #[error("Book balance already equals the statement balance")]
    NothingToAdjust,

    /// The adjustment entry was rejected by the posting rules.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ReconciliationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::LedgerNotFound(_) => "LEDGER_NOT_FOUND",
            Self::NotBankLedger { .. } => "NOT_BANK_LEDGER",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::OverlappingSession(_) => "OVERLAPPING_SESSION",
            Self::SessionClosed(_) => "SESSION_CLOSED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::UnreconciledItems { .. } => "UNRECONCILED_ITEMS",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::NothingToAdjust => "NOTHING_TO_ADJUST",
            Self::Ledger(err) => err.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotBankLedger { .. } | Self::InvalidPeriod { .. } | Self::NothingToAdjust => 400,
            Self::NotAuthorized { .. } => 403,
            Self::SessionNotFound(_) | Self::ItemNotFound(_) | Self::LedgerNotFound(_) => 404,
            Self::OverlappingSession(_) | Self::SessionClosed(_) | Self::InvalidTransition { .. } => 409,
            Self::UnreconciledItems { .. } => 422,
            Self::Ledger(err) => err.status_code(),
            Self::Database(_) => 500,
        }
    }
}
