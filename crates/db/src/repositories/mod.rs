//! Repository abstractions for data access.
//!
//! Each repository executes one engine operation as one database
//! transaction, delegating every rule to `devalaya-core`.

pub mod balance;
pub mod budget;
pub mod chart;
pub mod closing;
pub mod entry;
pub mod fiscal;
pub(crate) mod queries;
pub mod reconciliation;
pub mod workflow;

pub use balance::BalanceRepository;
pub use budget::BudgetRepository;
pub use chart::{ChartRepository, CreateGroupInput, CreateLedgerInput};
pub use closing::ClosingRepository;
pub use entry::EntryRepository;
pub use fiscal::FiscalRepository;
pub use reconciliation::ReconciliationRepository;
pub use workflow::WorkflowRepository;
