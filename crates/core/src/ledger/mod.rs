//! Double-entry postings and ledger balances.
//!
//! - Entry domain types and the seven entry kinds
//! - Structural validation (line shape, exact balance)
//! - Kind-specific ledger rules
//! - The posting validation pipeline
//! - Balance derivation, statements, and the balance cache
//! - Trial balance

pub mod balance;
pub mod cache;
pub mod error;
pub mod kinds;
pub mod service;
pub mod trial_balance;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use balance::{ApprovedLine, BalanceEngine, BalanceSnapshot, LedgerStatement, NormalBalance, RunningBalance};
pub use cache::BalanceCache;
pub use error::LedgerError;
pub use kinds::{KindContext, KindValidator, validate_kind};
pub use service::{EntryService, PostingContext};
pub use trial_balance::{TrialBalance, TrialBalanceRow};
pub use types::{
    Entry, EntryKind, EntryLine, EntryLineInput, EntryTotals, LockedPeriod, PostEntryInput, PostedEntry,
    ResolvedLine, Side, ValidatedEntry,
};
pub use validation::{line_side, validate_lines};
