//! Database layer for the Devalaya general ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories running each ledger operation as one transaction
//! - The schema migration
//! - [`LedgerStore`], one handle over every repository

mod convert;
pub mod entities;
pub mod migration;
pub mod repositories;
mod store;

pub use repositories::{
    BalanceRepository, BudgetRepository, ChartRepository, ClosingRepository, EntryRepository, FiscalRepository,
    ReconciliationRepository, WorkflowRepository,
};
pub use store::LedgerStore;

use std::time::Duration;

use devalaya_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
