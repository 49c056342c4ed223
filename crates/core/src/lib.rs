//! Core business logic for the Devalaya general ledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `actor` - Acting user and capability flags
//! - `chart` - Account groups and ledgers
//! - `fiscal` - Accounting years
//! - `ledger` - Double-entry postings, balances, and the trial balance
//! - `workflow` - Entry approval state machine
//! - `budget` - Budget allocations, overrun checks, and variance
//! - `reconciliation` - Bank reconciliation sessions
//! - `closing` - Year-end closing and carry-forward

pub mod actor;
pub mod budget;
pub mod chart;
pub mod closing;
pub mod fiscal;
pub mod ledger;
pub mod reconciliation;
pub mod workflow;
