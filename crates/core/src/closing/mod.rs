//! Year-end closing.
//!
//! `validate` runs the checklist, `execute` (driven by the store) moves the
//! year OPEN → CLOSING → CLOSED, writing one closing row and one next-year
//! opening per ledger. Ledgers already holding a closing row are skipped, so
//! an interrupted run can be resumed safely.

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::ClosingError;
pub use service::ClosingService;
pub use types::{
    ClosingFacts, ClosingIssue, ClosingPlan, ClosingReport, ClosingValidation, LedgerClosing, LedgerClosingFigure,
};
