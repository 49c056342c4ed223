//! `SeaORM` entity definitions, one module per table.

#![allow(missing_docs)]

pub mod account_groups;
pub mod accounting_years;
pub mod budgets;
pub mod entries;
pub mod entry_lines;
pub mod ledger_closings;
pub mod ledgers;
pub mod opening_balances;
pub mod reconciliation_items;
pub mod reconciliation_sessions;
pub mod sea_orm_active_enums;
