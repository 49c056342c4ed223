//! Workflow repository for entry approval, rejection, and cancellation.
//!
//! Every transition locks the entry row with `SELECT ... FOR UPDATE`, so two
//! racing approvals of the same entry serialize: the second one sees
//! APPROVED and fails with `InvalidTransition`.

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{info, warn};

use devalaya_core::actor::Actor;
use devalaya_core::chart::Ledger;
use devalaya_core::ledger::{BalanceCache, EntryLine, EntryService, EntryTotals, LedgerError, PostedEntry};
use devalaya_core::fiscal::YearStatus;
use devalaya_core::workflow::{ApprovalStats, EntryStatus, WorkflowError, WorkflowService};
use devalaya_shared::BudgetPolicy;
use devalaya_shared::types::{AccountingYearId, EntryId, LedgerId, TempleId};

use super::entry::{apply_action, ensure_unlocked_in, entry_ledgers, lock_entry};
use super::queries::{self, RowLock};
use crate::entities::entries;
use crate::entities::entry_lines;
use crate::entities::sea_orm_active_enums::EntryStatus as DbEntryStatus;

/// Workflow repository.
#[derive(Debug, Clone)]
pub struct WorkflowRepository {
    db: DatabaseConnection,
    cache: BalanceCache,
    budget_policy: BudgetPolicy,
}

fn db_err(e: DbErr) -> WorkflowError {
    WorkflowError::Database(e.to_string())
}

impl WorkflowRepository {
    /// Creates a new workflow repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, cache: BalanceCache, budget_policy: BudgetPolicy) -> Self {
        Self {
            db,
            cache,
            budget_policy,
        }
    }

    /// Approves a PENDING entry.
    ///
    /// The budget check runs again against the spend approved since the entry
    /// was posted; under the strict policy the touched expense ledgers are
    /// locked first so concurrent approvals cannot both slip under the limit.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized`, `InvalidTransition` with the current status,
    /// `ClosedPeriod` when the year no longer accepts postings, `PeriodLocked`
    /// when the entry date sits in a locked reconciliation period, or
    /// `BudgetOverrun` under the strict policy.
    pub async fn approve(
        &self,
        temple_id: TempleId,
        entry_id: EntryId,
        actor: &Actor,
        note: Option<String>,
    ) -> Result<PostedEntry, WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let header = lock_entry(&txn, temple_id, entry_id).await?;
        let action = WorkflowService::approve(header.status.into(), actor, note)?;

        let year_id = AccountingYearId::from_uuid(header.year_id);
        let year = queries::find_year(&txn, temple_id, year_id, RowLock::Shared)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::YearNotFound(year_id))?;
        let year_status: YearStatus = year.status.into();
        if !year_status.allows_posting() {
            return Err(WorkflowError::ClosedPeriod {
                year_id,
                status: year_status,
            });
        }

        let lines: Vec<EntryLine> = entry_lines::Entity::find()
            .filter(entry_lines::Column::EntryId.eq(entry_id.into_inner()))
            .order_by_asc(entry_lines::Column::LineNo)
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(EntryLine::from)
            .collect();
        let ledger_ids = unique_ledgers(&lines);
        ensure_unlocked_in(&txn, temple_id, &header, &ledger_ids).await?;

        let ledgers = queries::ledgers_by_ids(&txn, temple_id, &ledger_ids, RowLock::None)
            .await
            .map_err(db_err)?;
        let expense_ids: Vec<LedgerId> = ledgers
            .iter()
            .filter(|l| l.is_expense_classified())
            .map(|l| l.id)
            .collect();
        if self.budget_policy.is_strict() && !expense_ids.is_empty() {
            queries::ledgers_by_ids(&txn, temple_id, &expense_ids, RowLock::Exclusive)
                .await
                .map_err(db_err)?;
        }
        let by_id: HashMap<LedgerId, Ledger> = ledgers.into_iter().map(|l| (l.id, l)).collect();
        let positions = queries::budget_positions(&txn, temple_id, year_id, &expense_ids)
            .await
            .map_err(db_err)?;

        let debits = EntryService::stored_expense_debits(&lines, |id| by_id.get(&id));
        let budget_warnings = EntryService::check_budgets(&debits, self.budget_policy, |id| {
            positions.get(&id).copied().unwrap_or_default()
        })?;

        apply_action(&txn, header, &action).await?;
        txn.commit().await.map_err(db_err)?;

        self.cache.invalidate_ledgers(temple_id, &ledger_ids, year_id);
        for warning in &budget_warnings {
            warn!(
                temple_id = %temple_id,
                entry_id = %entry_id,
                ledger_id = %warning.ledger_id,
                overrun = %warning.overrun,
                "Budget exceeded on approval"
            );
        }
        info!(temple_id = %temple_id, entry_id = %entry_id, approved_by = %actor.id, "Entry approved");

        Ok(PostedEntry {
            entry_id,
            status: action.new_status(),
            totals: EntryTotals::new(
                lines.iter().map(|l| l.debit).sum(),
                lines.iter().map(|l| l.credit).sum(),
            ),
            budget_warnings,
        })
    }

    /// Rejects a PENDING entry. Rejected entries never touch balances.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` or `InvalidTransition` with the current status.
    pub async fn reject(
        &self,
        temple_id: TempleId,
        entry_id: EntryId,
        actor: &Actor,
        note: Option<String>,
    ) -> Result<(), WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let header = lock_entry(&txn, temple_id, entry_id).await?;
        let action = WorkflowService::reject(header.status.into(), actor, note)?;

        apply_action(&txn, header, &action).await?;
        txn.commit().await.map_err(db_err)?;

        info!(temple_id = %temple_id, entry_id = %entry_id, rejected_by = %actor.id, "Entry rejected");
        Ok(())
    }

    /// Cancels an APPROVED entry in an OPEN year, removing its balance effect.
    ///
    /// # Errors
    ///
    /// Returns `CancelReasonRequired`, `NotAuthorized`, `InvalidTransition`,
    /// `ClosedPeriod`, or `PeriodLocked` when the entry date sits in a locked
    /// reconciliation period.
    pub async fn cancel(
        &self,
        temple_id: TempleId,
        entry_id: EntryId,
        actor: &Actor,
        reason: String,
    ) -> Result<(), WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let header = lock_entry(&txn, temple_id, entry_id).await?;

        let year_id = AccountingYearId::from_uuid(header.year_id);
        let year = queries::find_year(&txn, temple_id, year_id, RowLock::Shared)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::YearNotFound(year_id))?;
        let action = WorkflowService::cancel(header.status.into(), actor, year_id, year.status.into(), reason)?;

        let ledger_ids = entry_ledgers(&txn, entry_id).await?;
        ensure_unlocked_in(&txn, temple_id, &header, &ledger_ids).await?;
        apply_action(&txn, header, &action).await?;
        txn.commit().await.map_err(db_err)?;

        self.cache.invalidate_ledgers(temple_id, &ledger_ids, year_id);
        info!(temple_id = %temple_id, entry_id = %entry_id, cancelled_by = %actor.id, "Entry cancelled");
        Ok(())
    }

    /// Per-status entry counts, optionally for one year.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn stats(&self, temple_id: TempleId, year_id: Option<AccountingYearId>) -> Result<ApprovalStats, WorkflowError> {
        let mut query = entries::Entity::find().filter(entries::Column::TempleId.eq(temple_id.into_inner()));
        if let Some(year_id) = year_id {
            query = query.filter(entries::Column::YearId.eq(year_id.into_inner()));
        }

        let mut stats = ApprovalStats::default();
        for status in EntryStatus::ALL {
            let count = query
                .clone()
                .filter(entries::Column::Status.eq(DbEntryStatus::from(status)))
                .count(&self.db)
                .await
                .map_err(db_err)?;
            stats.add(status, count);
        }
        Ok(stats)
    }
}

fn unique_ledgers(lines: &[EntryLine]) -> Vec<LedgerId> {
    let mut ids: Vec<LedgerId> = Vec::with_capacity(lines.len());
    for line in lines {
        if !ids.contains(&line.ledger_id) {
            ids.push(line.ledger_id);
        }
    }
    ids
}
