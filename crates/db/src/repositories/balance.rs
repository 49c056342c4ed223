//! Balance repository: ledger balances, statements, trial balance, and group
//! summaries.
//!
//! Balances are never stored. They are derived from APPROVED lines on every
//! read; full-year balances are memoised in the shared [`BalanceCache`],
//! which the entry and workflow repositories invalidate on every transition.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DbErr};
use tracing::{debug, warn};

use devalaya_core::chart::{GroupSummary, Ledger};
use devalaya_core::ledger::{BalanceCache, BalanceEngine, BalanceSnapshot, LedgerError, LedgerStatement, TrialBalance};
use devalaya_shared::types::{AccountingYearId, LedgerId, TempleId};

use super::chart::load_chart;
use super::queries::{self, RowLock};

/// Balance repository.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
    cache: BalanceCache,
}

fn db_err(e: DbErr) -> LedgerError {
    LedgerError::Database(e.to_string())
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, cache: BalanceCache) -> Self {
        Self { db, cache }
    }

    /// Balance of one ledger for a year, cut off at `as_of` when given.
    ///
    /// Full-year balances are served from the cache when present.
    ///
    /// # Errors
    ///
    /// Returns `YearNotFound` or `LedgerNotFound`.
    pub async fn balance(
        &self,
        temple_id: TempleId,
        ledger_id: LedgerId,
        year_id: AccountingYearId,
        as_of: Option<NaiveDate>,
    ) -> Result<BalanceSnapshot, LedgerError> {
        if as_of.is_none() {
            if let Some(snapshot) = self.cache.get(temple_id, ledger_id, year_id) {
                debug!(ledger_id = %ledger_id, year_id = %year_id, "Balance cache hit");
                return Ok(snapshot);
            }
        }

        let statement = self.statement(temple_id, ledger_id, year_id, as_of).await?;
        let snapshot = BalanceSnapshot {
            opening: statement.opening,
            debit_total: statement.debit_total,
            credit_total: statement.credit_total,
            closing: statement.closing,
        };
        if as_of.is_none() {
            self.cache.insert(temple_id, ledger_id, year_id, snapshot);
        }
        Ok(snapshot)
    }

    /// Ledger statement: opening, every APPROVED line with its running
    /// balance, and the closing balance.
    ///
    /// # Errors
    ///
    /// Returns `YearNotFound` or `LedgerNotFound`.
    pub async fn statement(
        &self,
        temple_id: TempleId,
        ledger_id: LedgerId,
        year_id: AccountingYearId,
        as_of: Option<NaiveDate>,
    ) -> Result<LedgerStatement, LedgerError> {
        self.ensure_year(temple_id, year_id).await?;
        let ledger = self.ledger(temple_id, ledger_id).await?;

        let carried = queries::carried_openings(&self.db, temple_id, year_id)
            .await
            .map_err(db_err)?
            .get(&ledger_id)
            .copied();
        let opening = BalanceEngine::opening(&ledger, year_id, carried);
        let lines = queries::approved_lines(&self.db, temple_id, year_id, Some(std::slice::from_ref(&ledger_id)), as_of)
            .await
            .map_err(db_err)?;

        Ok(BalanceEngine::statement(ledger.id, ledger.nature, year_id, opening, &lines, as_of))
    }

    /// Trial balance of every ledger for a year.
    ///
    /// # Errors
    ///
    /// Returns `YearNotFound` or a database error.
    pub async fn trial_balance(
        &self,
        temple_id: TempleId,
        year_id: AccountingYearId,
        as_of: Option<NaiveDate>,
    ) -> Result<TrialBalance, LedgerError> {
        let balances = self.snapshots(temple_id, year_id, as_of).await?;
        let report = TrialBalance::build(year_id, as_of, &balances);
        if !report.is_balanced {
            warn!(
                temple_id = %temple_id,
                year_id = %year_id,
                total_debit = %report.total_debit,
                total_credit = %report.total_credit,
                "Trial balance does not agree"
            );
        }
        Ok(report)
    }

    /// Closing balance of every group, aggregated recursively over its
    /// subtree.
    ///
    /// # Errors
    ///
    /// Returns `YearNotFound` or a database error.
    pub async fn group_summary(
        &self,
        temple_id: TempleId,
        year_id: AccountingYearId,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<GroupSummary>, LedgerError> {
        let balances: HashMap<LedgerId, Decimal> = self
            .snapshots(temple_id, year_id, as_of)
            .await?
            .into_iter()
            .map(|(ledger, snapshot)| (ledger.id, snapshot.closing))
            .collect();
        let chart = load_chart(&self.db, temple_id)
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;
        Ok(chart.summarize(&balances))
    }

    async fn snapshots(
        &self,
        temple_id: TempleId,
        year_id: AccountingYearId,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<(Ledger, BalanceSnapshot)>, LedgerError> {
        self.ensure_year(temple_id, year_id).await?;
        let balances = queries::snapshots(&self.db, temple_id, year_id, as_of)
            .await
            .map_err(db_err)?;
        if as_of.is_none() {
            for (ledger, snapshot) in &balances {
                self.cache.insert(temple_id, ledger.id, year_id, *snapshot);
            }
        }
        Ok(balances)
    }

    async fn ensure_year(&self, temple_id: TempleId, year_id: AccountingYearId) -> Result<(), LedgerError> {
        queries::find_year(&self.db, temple_id, year_id, RowLock::None)
            .await
            .map_err(db_err)?
            .map(|_| ())
            .ok_or(LedgerError::YearNotFound(year_id))
    }

    async fn ledger(&self, temple_id: TempleId, ledger_id: LedgerId) -> Result<Ledger, LedgerError> {
        queries::ledgers_by_ids(&self.db, temple_id, &[ledger_id], RowLock::None)
            .await
            .map_err(db_err)?
            .into_iter()
            .next()
            .ok_or(LedgerError::LedgerNotFound(ledger_id))
    }
}
