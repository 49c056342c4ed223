//! Entry approval workflow.
//!
//! Entries are created PENDING (or APPROVED for auto-approving actors) and
//! only APPROVED entries count towards balances.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (`EntryStatus`, `WorkflowAction`, filters)
//! - `error` - Workflow-specific error types
//! - `service` - State transition logic

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::WorkflowError;
pub use service::WorkflowService;
pub use types::{ApprovalStats, EntryFilter, EntryStatus, WorkflowAction};
