//! Full-year balance caching using Moka.
//!
//! Entries are keyed by (temple, ledger, year). Every entry transition that
//! touches a ledger must invalidate its key; a stale entry is never refreshed
//! in place.

use devalaya_shared::types::{AccountingYearId, LedgerId, TempleId};
use moka::sync::Cache;
use std::time::Duration;

use super::balance::BalanceSnapshot;

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Default time-to-live for cache entries (15 minutes).
const DEFAULT_TTL_SECS: u64 = 900;

/// Cache key. The temple is part of the key so one temple can never be
/// served another temple's cached balance.
type BalanceKey = (TempleId, LedgerId, AccountingYearId);

/// Cache of full-year ledger balances.
///
/// Cheap to clone; clones share the same underlying store.
#[derive(Clone)]
pub struct BalanceCache {
    cache: Cache<BalanceKey, BalanceSnapshot>,
}

impl BalanceCache {
    /// Creates a new balance cache with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a new balance cache with custom configuration.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Returns the cached balance, if any.
    #[must_use]
    pub fn get(&self, temple_id: TempleId, ledger_id: LedgerId, year_id: AccountingYearId) -> Option<BalanceSnapshot> {
        self.cache.get(&(temple_id, ledger_id, year_id))
    }

    /// Stores a freshly computed balance.
    pub fn insert(&self, temple_id: TempleId, ledger_id: LedgerId, year_id: AccountingYearId, snapshot: BalanceSnapshot) {
        self.cache.insert((temple_id, ledger_id, year_id), snapshot);
    }

    /// Returns the cached balance or computes and stores it.
    pub fn get_or_compute<F>(
        &self,
        temple_id: TempleId,
        ledger_id: LedgerId,
        year_id: AccountingYearId,
        compute: F,
    ) -> BalanceSnapshot
    where
        F: FnOnce() -> BalanceSnapshot,
    {
        self.cache.get_with((temple_id, ledger_id, year_id), compute)
    }

    /// Drops one cached balance.
    pub fn invalidate(&self, temple_id: TempleId, ledger_id: LedgerId, year_id: AccountingYearId) {
        self.cache.invalidate(&(temple_id, ledger_id, year_id));
    }

    /// Drops the cached balances of every ledger an entry touched.
    pub fn invalidate_ledgers(&self, temple_id: TempleId, ledger_ids: &[LedgerId], year_id: AccountingYearId) {
        for ledger_id in ledger_ids {
            self.invalidate(temple_id, *ledger_id, year_id);
        }
    }

    /// Invalidates all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs cache maintenance tasks.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BalanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}
