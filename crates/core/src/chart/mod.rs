//! Chart of accounts: hierarchical account groups and the ledgers under them.
//!
//! The hierarchy is an arena of nodes keyed by opaque ids. Parent links are
//! validated by walking ancestors before they are committed, so the group
//! graph is always a forest.

pub mod error;
pub mod tree;
pub mod types;

#[cfg(test)]
mod tree_props;

pub use error::ChartError;
pub use tree::{ChartOfAccounts, GroupNode, GroupSummary};
pub use types::{AccountGroup, AccountNature, Ledger, LedgerType};
