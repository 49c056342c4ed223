//! One handle over every repository, sharing the pool and the balance cache.

use sea_orm::DatabaseConnection;

use devalaya_core::actor::Actor;
use devalaya_core::closing::{ClosingError, ClosingReport};
use devalaya_core::ledger::BalanceCache;
use devalaya_shared::LedgerConfig;
use devalaya_shared::types::{AccountingYearId, LedgerId, TempleId};

use crate::repositories::{
    BalanceRepository, BudgetRepository, ChartRepository, ClosingRepository, EntryRepository, FiscalRepository,
    ReconciliationRepository, WorkflowRepository,
};

/// The general ledger store.
///
/// Every repository that changes or reads balances shares one
/// [`BalanceCache`], so an approval invalidates what a later balance query
/// would otherwise serve.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    /// Chart of accounts.
    pub chart: ChartRepository,
    /// Accounting years.
    pub fiscal: FiscalRepository,
    /// Entry posting and reads.
    pub entries: EntryRepository,
    /// Approval workflow.
    pub workflow: WorkflowRepository,
    /// Balances and reports.
    pub balances: BalanceRepository,
    /// Budgets.
    pub budgets: BudgetRepository,
    /// Bank reconciliation.
    pub reconciliation: ReconciliationRepository,
    /// Year-end closing.
    pub closing: ClosingRepository,
    cache: BalanceCache,
}

impl LedgerStore {
    /// Builds every repository over `db` with the given engine settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        let cache = BalanceCache::with_config(config.balance_cache_capacity, config.balance_cache_ttl_secs);
        let policy = config.budget_policy;

        Self {
            chart: ChartRepository::new(db.clone()),
            fiscal: FiscalRepository::new(db.clone()),
            entries: EntryRepository::new(db.clone(), cache.clone(), policy),
            workflow: WorkflowRepository::new(db.clone(), cache.clone(), policy),
            balances: BalanceRepository::new(db.clone(), cache.clone()),
            budgets: BudgetRepository::new(db.clone()),
            reconciliation: ReconciliationRepository::new(db.clone(), cache.clone(), policy),
            closing: ClosingRepository::new(db, cache.clone(), config.closing_chunk_size),
            cache,
        }
    }

    /// The shared balance cache.
    #[must_use]
    pub fn cache(&self) -> &BalanceCache {
        &self.cache
    }

    /// Closes an accounting year through the year-end closing procedure.
    ///
    /// # Errors
    ///
    /// Same as [`ClosingRepository::execute`].
    pub async fn close_year(
        &self,
        temple_id: TempleId,
        year_id: AccountingYearId,
        actor: &Actor,
        surplus_ledger_id: Option<LedgerId>,
    ) -> Result<ClosingReport, ClosingError> {
        self.closing.execute(temple_id, year_id, actor, surplus_ledger_id).await
    }
}
