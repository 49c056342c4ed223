//! Bank reconciliation.
//!
//! A session covers one BANK or CASH ledger over a statement period. Approved
//! lines in the period are pulled in as items, matched against the statement,
//! and trued up with an adjustment Journal if needed. Sessions move
//! IN_PROGRESS → FINALIZED → LOCKED, and a locked session blocks further
//! postings to the ledger inside its period.

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::ReconciliationError;
pub use service::ReconciliationService;
pub use types::{
    AdjustmentInput, ItemStatus, ItemUpdate, ReconciliationItem, ReconciliationSession, ReconciliationSummary,
    SessionStatus, StartSessionInput,
};
