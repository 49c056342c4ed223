//! Year-end closing repository.
//!
//! Execution runs in three phases, each in its own transaction:
//! 1. Under an exclusive lock on the year row, re-validate and mark the year
//!    CLOSING. Postings hold a shared lock on the same row, so in-flight
//!    postings finish first and later ones see CLOSING and fail.
//! 2. Write closing markers and next-year openings chunk by chunk. Each chunk
//!    skips ledgers an earlier (possibly interrupted) run already closed.
//! 3. Mark the year CLOSED.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use devalaya_core::actor::Actor;
use devalaya_core::closing::{
    ClosingError, ClosingFacts, ClosingIssue, ClosingPlan, ClosingReport, ClosingService, ClosingValidation, LedgerClosing,
    LedgerClosingFigure,
};
use devalaya_core::fiscal::{AccountingYear, YearService, YearStatus};
use devalaya_core::ledger::BalanceCache;
use devalaya_shared::types::{AccountingYearId, LedgerId, TempleId};

use super::queries::{self, RowLock};
use crate::entities::sea_orm_active_enums::{
    EntryStatus, OpeningBalanceSource, ReconciliationStatus, YearStatus as DbYearStatus,
};
use crate::entities::{
    accounting_years, entries, ledger_closings, opening_balances, reconciliation_sessions,
};

/// Year-end closing repository.
#[derive(Debug, Clone)]
pub struct ClosingRepository {
    db: DatabaseConnection,
    cache: BalanceCache,
    chunk_size: usize,
}

fn db_err(e: DbErr) -> ClosingError {
    ClosingError::Database(e.to_string())
}

impl ClosingRepository {
    /// Creates a new closing repository writing `chunk_size` ledgers per
    /// transaction.
    #[must_use]
    pub const fn new(db: DatabaseConnection, cache: BalanceCache, chunk_size: usize) -> Self {
        Self { db, cache, chunk_size }
    }

    /// Runs the closing checklist. Never mutates anything.
    ///
    /// # Errors
    ///
    /// Returns `YearNotFound` or a database error.
    pub async fn validate(&self, temple_id: TempleId, year_id: AccountingYearId) -> Result<ClosingValidation, ClosingError> {
        let year = AccountingYear::from(find_year(&self.db, temple_id, year_id, RowLock::None).await?);
        let facts = gather_facts(&self.db, temple_id, &year).await?;
        Ok(ClosingService::validate(&facts))
    }

    /// Percentage of passed checklist items.
    ///
    /// # Errors
    ///
    /// Same as [`Self::validate`].
    pub async fn progress(&self, temple_id: TempleId, year_id: AccountingYearId) -> Result<u8, ClosingError> {
        Ok(ClosingService::progress(&self.validate(temple_id, year_id).await?))
    }

    /// Closing markers written for a year.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn closings(&self, temple_id: TempleId, year_id: AccountingYearId) -> Result<Vec<LedgerClosing>, ClosingError> {
        Ok(ledger_closings::Entity::find()
            .filter(ledger_closings::Column::TempleId.eq(temple_id.into_inner()))
            .filter(ledger_closings::Column::YearId.eq(year_id.into_inner()))
            .order_by_asc(ledger_closings::Column::LedgerId)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(LedgerClosing::from)
            .collect())
    }

    /// Closes a year and carries its balances into the next year.
    ///
    /// Re-running on a CLOSING year resumes where the previous run stopped.
    /// With `surplus_ledger_id` set, income and expense balances are not
    /// carried; their net is added to that equity ledger's opening.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` without `can_close_year`, `InvalidTransition`
    /// for a CLOSED year, `Blocked` with the checklist issues, or
    /// `SurplusLedgerInvalid`.
    pub async fn execute(
        &self,
        temple_id: TempleId,
        year_id: AccountingYearId,
        actor: &Actor,
        surplus_ledger_id: Option<LedgerId>,
    ) -> Result<ClosingReport, ClosingError> {
        ClosingService::authorize(actor)?;

        // Phase 1: freeze the year.
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = find_year(&txn, temple_id, year_id, RowLock::Exclusive).await?;
        let year = AccountingYear::from(model.clone());
        let facts = gather_facts(&txn, temple_id, &year).await?;
        let validation = ClosingService::validate(&facts);
        let status = match ClosingService::begin(year.status, &validation) {
            Ok(status) => status,
            Err(err) => {
                warn!(temple_id = %temple_id, year_id = %year_id, error = %err, "Year-end closing rejected");
                return Err(err);
            }
        };
        let next_year_id = facts.next_year_id.ok_or(ClosingError::Blocked {
            issues: vec![ClosingIssue::NextYearMissing],
        })?;
        if let Some(id) = surplus_ledger_id {
            let ledger = queries::ledgers_by_ids(&txn, temple_id, &[id], RowLock::None)
                .await
                .map_err(db_err)?
                .into_iter()
                .next()
                .ok_or(ClosingError::SurplusLedgerInvalid(id))?;
            ClosingService::check_surplus_ledger(&ledger)?;
        }
        if year.status != status {
            let mut active: accounting_years::ActiveModel = model.into();
            active.status = Set(DbYearStatus::from(status));
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await.map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, year_id = %year_id, resumed = year.status == YearStatus::Closing, "Year-end closing started");

        // Phase 2: figures are stable now that the year is frozen.
        let balances = queries::snapshots(&self.db, temple_id, year_id, None)
            .await
            .map_err(db_err)?;
        let surplus_ledger = match surplus_ledger_id {
            Some(id) => Some(
                balances
                    .iter()
                    .map(|(ledger, _)| ledger)
                    .find(|l| l.id == id)
                    .ok_or(ClosingError::SurplusLedgerInvalid(id))?,
            ),
            None => None,
        };
        let plan = ClosingService::plan(year_id, next_year_id, &balances, surplus_ledger)?;

        // A ledger created in the next year keeps its own opening on top of
        // whatever is carried into it.
        let own_openings: HashMap<LedgerId, Decimal> = balances
            .iter()
            .map(|(ledger, _)| (ledger.id, ledger.own_opening_for(next_year_id)))
            .filter(|(_, amount)| !amount.is_zero())
            .collect();

        let mut closed: u64 = 0;
        let mut skipped: u64 = 0;
        for chunk in plan.figures.chunks(self.chunk_size.max(1)) {
            let (written, already) = self.write_chunk(temple_id, &plan, chunk, &own_openings).await?;
            closed += written;
            skipped += already;
        }

        // Phase 3
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = find_year(&txn, temple_id, year_id, RowLock::Exclusive).await?;
        let final_status = ClosingService::finish(model.status.into())?;
        let mut active: accounting_years::ActiveModel = model.into();
        active.status = Set(DbYearStatus::from(final_status));
        active.is_active = Set(false);
        active.closed_by = Set(Some(actor.id.into_inner()));
        active.closed_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        self.cache.invalidate_all();
        info!(
            temple_id = %temple_id,
            year_id = %year_id,
            next_year_id = %next_year_id,
            ledgers_closed = closed,
            ledgers_skipped = skipped,
            surplus = %plan.surplus,
            "Accounting year closed"
        );

        Ok(ClosingReport {
            year_id,
            ledgers_closed: closed,
            ledgers_skipped: skipped,
            status: final_status,
        })
    }

    /// Writes one chunk, returning (written, already closed).
    async fn write_chunk(
        &self,
        temple_id: TempleId,
        plan: &ClosingPlan,
        chunk: &[LedgerClosingFigure],
        own_openings: &HashMap<LedgerId, Decimal>,
    ) -> Result<(u64, u64), ClosingError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Serializes concurrent runs so a ledger is never written twice.
        let year = find_year(&txn, temple_id, plan.year_id, RowLock::Exclusive).await?;
        let status: YearStatus = year.status.into();
        if status != YearStatus::Closing {
            return Err(ClosingError::InvalidTransition {
                from: status,
                to: YearStatus::Closed,
            });
        }

        let ids: Vec<Uuid> = chunk.iter().map(|f| f.ledger_id.into_inner()).collect();
        let existing: Vec<Uuid> = ledger_closings::Entity::find()
            .filter(ledger_closings::Column::YearId.eq(plan.year_id.into_inner()))
            .filter(ledger_closings::Column::LedgerId.is_in(ids))
            .select_only()
            .column(ledger_closings::Column::LedgerId)
            .into_tuple()
            .all(&txn)
            .await
            .map_err(db_err)?;
        let already: HashSet<LedgerId> = existing.into_iter().map(LedgerId::from_uuid).collect();

        let plan_chunk = ClosingPlan {
            figures: chunk.to_vec(),
            ..plan.clone()
        };
        let pending = ClosingService::pending(&plan_chunk, &already);
        if pending.is_empty() {
            txn.commit().await.map_err(db_err)?;
            return Ok((0, chunk.len() as u64));
        }

        let now = Utc::now();
        let closings: Vec<ledger_closings::ActiveModel> = pending
            .iter()
            .map(|figure| {
                let record = ClosingService::closing_record(plan, figure);
                ledger_closings::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    temple_id: Set(temple_id.into_inner()),
                    year_id: Set(record.year_id.into_inner()),
                    ledger_id: Set(record.ledger_id.into_inner()),
                    closing_balance: Set(record.closing_balance),
                    carried_forward: Set(record.carried_forward),
                    next_year_id: Set(record.next_year_id.into_inner()),
                    created_at: Set(now.into()),
                }
            })
            .collect();
        let openings: Vec<opening_balances::ActiveModel> = pending
            .iter()
            .map(|figure| opening_balances::ActiveModel {
                id: Set(Uuid::now_v7()),
                temple_id: Set(temple_id.into_inner()),
                ledger_id: Set(figure.ledger_id.into_inner()),
                year_id: Set(plan.next_year_id.into_inner()),
                amount: Set(figure.carried_forward + own_openings.get(&figure.ledger_id).copied().unwrap_or_default()),
                source: Set(OpeningBalanceSource::CarriedForward),
                created_at: Set(now.into()),
            })
            .collect();

        let written = pending.len() as u64;
        ledger_closings::Entity::insert_many(closings)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        opening_balances::Entity::insert_many(openings)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        Ok((written, chunk.len() as u64 - written))
    }
}

async fn find_year<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    year_id: AccountingYearId,
    lock: RowLock,
) -> Result<accounting_years::Model, ClosingError> {
    queries::find_year(conn, temple_id, year_id, lock)
        .await
        .map_err(db_err)?
        .ok_or(ClosingError::YearNotFound(year_id))
}

async fn gather_facts<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    year: &AccountingYear,
) -> Result<ClosingFacts, ClosingError> {
    let pending_entries = entries::Entity::find()
        .filter(entries::Column::TempleId.eq(temple_id.into_inner()))
        .filter(entries::Column::YearId.eq(year.id.into_inner()))
        .filter(entries::Column::Status.eq(EntryStatus::Pending))
        .count(conn)
        .await
        .map_err(db_err)?;

    let bank_ledgers: Vec<(LedgerId, String)> = queries::all_ledgers(conn, temple_id)
        .await
        .map_err(db_err)?
        .into_iter()
        .filter(|l| l.is_active && l.ledger_type.is_bank_or_cash())
        .map(|l| (l.id, l.code))
        .collect();

    let reconciled: Vec<Uuid> = reconciliation_sessions::Entity::find()
        .filter(reconciliation_sessions::Column::TempleId.eq(temple_id.into_inner()))
        .filter(reconciliation_sessions::Column::YearId.eq(year.id.into_inner()))
        .filter(
            reconciliation_sessions::Column::Status
                .is_in([ReconciliationStatus::Finalized, ReconciliationStatus::Locked]),
        )
        .select_only()
        .column(reconciliation_sessions::Column::LedgerId)
        .distinct()
        .into_tuple()
        .all(conn)
        .await
        .map_err(db_err)?;

    let years: Vec<AccountingYear> = accounting_years::Entity::find()
        .filter(accounting_years::Column::TempleId.eq(temple_id.into_inner()))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(AccountingYear::from)
        .collect();
    let next_year_id = YearService::next_year(year, &years).map(|y| y.id);

    Ok(ClosingFacts {
        year_id: year.id,
        year_status: year.status,
        pending_entries,
        bank_ledgers,
        reconciled_ledgers: reconciled.into_iter().map(LedgerId::from_uuid).collect(),
        next_year_id,
    })
}
