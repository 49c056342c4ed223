//! Bank reconciliation repository.
//!
//! Every operation on a session locks the session row first, so matching,
//! adjusting, finalizing and locking never interleave on the same session.

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use devalaya_core::actor::Actor;
use devalaya_core::fiscal::AccountingYear;
use devalaya_core::ledger::{BalanceCache, BalanceEngine, LedgerError, PostedEntry};
use devalaya_core::reconciliation::{
    AdjustmentInput, ItemStatus, ItemUpdate, ReconciliationError, ReconciliationItem, ReconciliationService,
    ReconciliationSession, ReconciliationSummary, SessionStatus, StartSessionInput,
};
use devalaya_shared::BudgetPolicy;
use devalaya_shared::types::{EntryLineId, LedgerId, ReconciliationId, ReconciliationItemId, TempleId};

use super::entry::post_in;
use super::queries::{self, RowLock};
use crate::entities::sea_orm_active_enums::ReconciliationItemStatus;
use crate::entities::{reconciliation_items, reconciliation_sessions};

/// Reconciliation repository.
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    db: DatabaseConnection,
    cache: BalanceCache,
    budget_policy: BudgetPolicy,
}

fn db_err(e: DbErr) -> ReconciliationError {
    ReconciliationError::Database(e.to_string())
}

impl ReconciliationRepository {
    /// Creates a new reconciliation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, cache: BalanceCache, budget_policy: BudgetPolicy) -> Self {
        Self {
            db,
            cache,
            budget_policy,
        }
    }

    /// Starts an IN_PROGRESS session for a bank or cash ledger.
    ///
    /// # Errors
    ///
    /// Returns `LedgerNotFound`, `NotBankLedger`, `InvalidPeriod`, or
    /// `OverlappingSession`.
    pub async fn start(
        &self,
        temple_id: TempleId,
        actor: &Actor,
        input: StartSessionInput,
    ) -> Result<ReconciliationSession, ReconciliationError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Serializes session starts on the ledger so overlap checks see each other.
        let ledger = queries::ledgers_by_ids(&txn, temple_id, &[input.ledger_id], RowLock::Exclusive)
            .await
            .map_err(db_err)?
            .into_iter()
            .next()
            .ok_or(ReconciliationError::LedgerNotFound(input.ledger_id))?;
        let year: AccountingYear = queries::find_year(&txn, temple_id, input.year_id, RowLock::None)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::YearNotFound(input.year_id))?
            .into();
        let existing = sessions_for_ledger(&txn, temple_id, input.ledger_id).await?;
        ReconciliationService::validate_start(&input, &ledger, &year, &existing)?;

        let session = ReconciliationSession {
            id: ReconciliationId::new(),
            ledger_id: input.ledger_id,
            year_id: input.year_id,
            period_from: input.period_from,
            period_to: input.period_to,
            statement_balance: input.statement_balance,
            status: SessionStatus::InProgress,
            created_by: actor.id,
            finalized_at: None,
            locked_by: None,
        };

        let now = Utc::now().into();
        reconciliation_sessions::ActiveModel {
            id: Set(session.id.into_inner()),
            temple_id: Set(temple_id.into_inner()),
            ledger_id: Set(session.ledger_id.into_inner()),
            year_id: Set(session.year_id.into_inner()),
            period_from: Set(session.period_from),
            period_to: Set(session.period_to),
            statement_balance: Set(session.statement_balance),
            status: Set(session.status.into()),
            created_by: Set(actor.id.into_inner()),
            finalized_at: Set(None),
            locked_by: Set(None),
            locked_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(
            temple_id = %temple_id,
            session_id = %session.id,
            ledger_id = %session.ledger_id,
            "Reconciliation session started"
        );
        Ok(session)
    }

    /// Fetches a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn get(
        &self,
        temple_id: TempleId,
        session_id: ReconciliationId,
    ) -> Result<ReconciliationSession, ReconciliationError> {
        find_session(&self.db, temple_id, session_id, RowLock::None)
            .await
            .map(ReconciliationSession::from)
    }

    /// Items of a session by entry date.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn items(
        &self,
        temple_id: TempleId,
        session_id: ReconciliationId,
    ) -> Result<Vec<ReconciliationItem>, ReconciliationError> {
        find_session(&self.db, temple_id, session_id, RowLock::None).await?;
        load_items(&self.db, session_id).await
    }

    /// Sessions of a ledger, oldest period first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        temple_id: TempleId,
        ledger_id: LedgerId,
    ) -> Result<Vec<ReconciliationSession>, ReconciliationError> {
        sessions_for_ledger(&self.db, temple_id, ledger_id).await
    }

    /// Adds every APPROVED line of the ledger inside the statement period
    /// that is not in the session yet, as unmatched items.
    ///
    /// Returns the newly added items; a second run adds nothing.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` or `SessionClosed`.
    pub async fn process(
        &self,
        temple_id: TempleId,
        session_id: ReconciliationId,
    ) -> Result<Vec<ReconciliationItem>, ReconciliationError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let session: ReconciliationSession = find_session(&txn, temple_id, session_id, RowLock::Exclusive)
            .await?
            .into();
        ReconciliationService::ensure_in_progress(&session)?;

        let included: HashSet<EntryLineId> = load_items(&txn, session_id)
            .await?
            .into_iter()
            .map(|i| i.line_id)
            .collect();
        let lines = queries::approved_lines(
            &txn,
            temple_id,
            session.year_id,
            Some(std::slice::from_ref(&session.ledger_id)),
            Some(session.period_to),
        )
        .await
        .map_err(db_err)?;

        let added = ReconciliationService::candidates(&session, &lines, &included);
        if !added.is_empty() {
            reconciliation_items::Entity::insert_many(added.iter().map(item_model))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, session_id = %session_id, added = added.len(), "Reconciliation items added");
        Ok(added)
    }

    /// Matches or unmatches items. All instructions apply or none do.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `SessionClosed`, or `ItemNotFound`.
    pub async fn update_items(
        &self,
        temple_id: TempleId,
        session_id: ReconciliationId,
        updates: &[ItemUpdate],
    ) -> Result<Vec<ReconciliationItem>, ReconciliationError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let session: ReconciliationSession = find_session(&txn, temple_id, session_id, RowLock::Exclusive)
            .await?
            .into();
        let mut items = load_items(&txn, session_id).await?;
        ReconciliationService::apply_updates(&session, &mut items, updates)?;

        let touched: HashSet<ReconciliationItemId> = updates.iter().map(|u| u.item_id).collect();
        for item in items.iter().filter(|i| touched.contains(&i.id)) {
            reconciliation_items::ActiveModel {
                id: Set(item.id.into_inner()),
                status: Set(item.status.into()),
                statement_date: Set(item.statement_date),
                statement_reference: Set(item.statement_reference.clone()),
                ..Default::default()
            }
            .update(&txn)
            .await
            .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, session_id = %session_id, updated = touched.len(), "Reconciliation items updated");
        Ok(items)
    }

    /// Records an investigation note on an item.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `SessionClosed`, or `ItemNotFound`.
    pub async fn add_note(
        &self,
        temple_id: TempleId,
        session_id: ReconciliationId,
        item_id: ReconciliationItemId,
        note: String,
    ) -> Result<(), ReconciliationError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let session: ReconciliationSession = find_session(&txn, temple_id, session_id, RowLock::Exclusive)
            .await?
            .into();
        let mut items = load_items(&txn, session_id).await?;
        ReconciliationService::add_note(&session, &mut items, item_id, note.clone())?;

        reconciliation_items::ActiveModel {
            id: Set(item_id.into_inner()),
            note: Set(Some(note)),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, session_id = %session_id, item_id = %item_id, "Reconciliation note added");
        Ok(())
    }

    /// Book versus statement summary of a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn summary(
        &self,
        temple_id: TempleId,
        session_id: ReconciliationId,
    ) -> Result<ReconciliationSummary, ReconciliationError> {
        let session: ReconciliationSession = find_session(&self.db, temple_id, session_id, RowLock::None)
            .await?
            .into();
        let items = load_items(&self.db, session_id).await?;
        let book = book_balance(&self.db, temple_id, &session).await?;
        Ok(ReconciliationService::summary(&session, book, &items))
    }

    /// Posts a Journal for the statement minus book variance against
    /// `input.contra_ledger_id`.
    ///
    /// An actor who may approve entries gets the journal APPROVED and
    /// recorded as a matched item at once. Anyone else posts it PENDING; it
    /// leaves the books and the session untouched until approved, after
    /// which `process` picks up its bank line like any other.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed`, `InvalidPeriod`, `NothingToAdjust`, or the
    /// posting rule failure wrapped in `Ledger`.
    pub async fn create_adjustment(
        &self,
        temple_id: TempleId,
        actor: &Actor,
        session_id: ReconciliationId,
        input: AdjustmentInput,
    ) -> Result<PostedEntry, ReconciliationError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let session: ReconciliationSession = find_session(&txn, temple_id, session_id, RowLock::Exclusive)
            .await?
            .into();
        ReconciliationService::ensure_in_progress(&session)?;

        let book = book_balance(&txn, temple_id, &session).await?;
        let entry = ReconciliationService::build_adjustment(&session, book, &input)?;
        let stored = post_in(
            &txn,
            temple_id,
            &ReconciliationService::adjustment_poster(actor),
            &entry,
            self.budget_policy,
            None,
        )
        .await?;
        let approved = stored.posted.status.affects_balances();

        // The bank line is always the first line of the adjustment.
        let bank_line = entry.lines.first().zip(stored.line_ids.first()).filter(|_| approved);
        if let Some((line, line_id)) = bank_line {
            let item = ReconciliationItem {
                id: ReconciliationItemId::new(),
                session_id,
                entry_id: stored.posted.entry_id,
                line_id: *line_id,
                entry_date: entry.entry_date,
                debit: line.debit,
                credit: line.credit,
                status: ItemStatus::Matched,
                statement_date: Some(entry.entry_date),
                statement_reference: None,
                note: Some(input.narration.clone()),
                is_adjustment: true,
            };
            item_model(&item).insert(&txn).await.map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        if approved {
            self.cache.invalidate_ledgers(temple_id, &stored.ledger_ids, session.year_id);
        }

        info!(
            temple_id = %temple_id,
            session_id = %session_id,
            entry_id = %stored.posted.entry_id,
            status = %stored.posted.status,
            variance = %(session.statement_balance - book),
            "Reconciliation adjustment posted"
        );
        Ok(stored.posted)
    }

    /// Finalizes a session whose items are all matched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` or `UnreconciledItems`.
    pub async fn finalize(
        &self,
        temple_id: TempleId,
        session_id: ReconciliationId,
    ) -> Result<ReconciliationSession, ReconciliationError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = find_session(&txn, temple_id, session_id, RowLock::Exclusive).await?;
        let items = load_items(&txn, session_id).await?;
        let finalized = ReconciliationService::finalize(&ReconciliationSession::from(model.clone()), &items)?;

        let mut active: reconciliation_sessions::ActiveModel = model.into();
        active.status = Set(finalized.status.into());
        active.finalized_at = Set(finalized.finalized_at.map(Into::into));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, session_id = %session_id, "Reconciliation session finalized");
        Ok(finalized)
    }

    /// Locks a finalized session, blocking postings into its period.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` or `InvalidTransition`.
    pub async fn lock(
        &self,
        temple_id: TempleId,
        session_id: ReconciliationId,
        actor: &Actor,
    ) -> Result<ReconciliationSession, ReconciliationError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = find_session(&txn, temple_id, session_id, RowLock::Exclusive).await?;
        let locked = ReconciliationService::lock(&ReconciliationSession::from(model.clone()), actor)?;

        let now = Utc::now();
        let mut active: reconciliation_sessions::ActiveModel = model.into();
        active.status = Set(locked.status.into());
        active.locked_by = Set(Some(actor.id.into_inner()));
        active.locked_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, session_id = %session_id, locked_by = %actor.id, "Reconciliation session locked");
        Ok(locked)
    }
}

async fn find_session<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    session_id: ReconciliationId,
    lock: RowLock,
) -> Result<reconciliation_sessions::Model, ReconciliationError> {
    let query = reconciliation_sessions::Entity::find_by_id(session_id.into_inner())
        .filter(reconciliation_sessions::Column::TempleId.eq(temple_id.into_inner()));
    let query = match lock {
        RowLock::None => query,
        RowLock::Shared => query.lock_shared(),
        RowLock::Exclusive => query.lock_exclusive(),
    };
    query
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(ReconciliationError::SessionNotFound(session_id))
}

async fn sessions_for_ledger<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    ledger_id: LedgerId,
) -> Result<Vec<ReconciliationSession>, ReconciliationError> {
    Ok(reconciliation_sessions::Entity::find()
        .filter(reconciliation_sessions::Column::TempleId.eq(temple_id.into_inner()))
        .filter(reconciliation_sessions::Column::LedgerId.eq(ledger_id.into_inner()))
        .order_by_asc(reconciliation_sessions::Column::PeriodFrom)
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(ReconciliationSession::from)
        .collect())
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    session_id: ReconciliationId,
) -> Result<Vec<ReconciliationItem>, ReconciliationError> {
    Ok(reconciliation_items::Entity::find()
        .filter(reconciliation_items::Column::SessionId.eq(session_id.into_inner()))
        .order_by_asc(reconciliation_items::Column::EntryDate)
        .order_by_asc(reconciliation_items::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(ReconciliationItem::from)
        .collect())
}

/// Ledger balance at the end of the statement period.
async fn book_balance<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    session: &ReconciliationSession,
) -> Result<Decimal, ReconciliationError> {
    let ledger = queries::ledgers_by_ids(conn, temple_id, &[session.ledger_id], RowLock::None)
        .await
        .map_err(db_err)?
        .into_iter()
        .next()
        .ok_or(ReconciliationError::LedgerNotFound(session.ledger_id))?;
    let carried = queries::carried_openings(conn, temple_id, session.year_id)
        .await
        .map_err(db_err)?
        .get(&ledger.id)
        .copied();
    let lines = queries::approved_lines(
        conn,
        temple_id,
        session.year_id,
        Some(std::slice::from_ref(&ledger.id)),
        Some(session.period_to),
    )
    .await
    .map_err(db_err)?;

    let opening = BalanceEngine::opening(&ledger, session.year_id, carried);
    let debit: Decimal = lines.iter().map(|l| l.debit).sum();
    let credit: Decimal = lines.iter().map(|l| l.credit).sum();
    Ok(BalanceEngine::snapshot(ledger.nature, opening, debit, credit).closing)
}

fn item_model(item: &ReconciliationItem) -> reconciliation_items::ActiveModel {
    reconciliation_items::ActiveModel {
        id: Set(item.id.into_inner()),
        session_id: Set(item.session_id.into_inner()),
        entry_id: Set(item.entry_id.into_inner()),
        line_id: Set(item.line_id.into_inner()),
        entry_date: Set(item.entry_date),
        debit: Set(item.debit),
        credit: Set(item.credit),
        status: Set(ReconciliationItemStatus::from(item.status)),
        statement_date: Set(item.statement_date),
        statement_reference: Set(item.statement_reference.clone()),
        note: Set(item.note.clone()),
        is_adjustment: Set(item.is_adjustment),
    }
}
