//! Entry repository: posting, editing, amending, and reading entries.
//!
//! `post` is the single entry point other modules use to record money
//! movements. It runs the whole validation pipeline inside one transaction
//! that holds a shared lock on the year row, so a concurrent closing either
//! waits for it or is seen by it.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use tracing::{info, warn};

use devalaya_core::actor::Actor;
use devalaya_core::chart::Ledger;
use devalaya_core::fiscal::AccountingYear;
use devalaya_core::ledger::{
    BalanceCache, Entry, EntryService, LedgerError, PostEntryInput, PostedEntry, PostingContext, ValidatedEntry,
};
use devalaya_core::workflow::{EntryFilter, EntryStatus, WorkflowAction, WorkflowError, WorkflowService};
use devalaya_shared::BudgetPolicy;
use devalaya_shared::types::{AccountingYearId, EntryId, EntryLineId, LedgerId, PageRequest, PageResponse, TempleId};

use super::queries::{self, RowLock};
use crate::convert::entry_from_models;
use crate::entities::sea_orm_active_enums::{EntryKind, EntryStatus as DbEntryStatus};
use crate::entities::{entries, entry_lines};

/// Entry repository.
#[derive(Debug, Clone)]
pub struct EntryRepository {
    db: DatabaseConnection,
    cache: BalanceCache,
    budget_policy: BudgetPolicy,
}

fn db_err(e: DbErr) -> LedgerError {
    LedgerError::Database(e.to_string())
}

/// A freshly written entry and the ids of its lines in line order.
#[derive(Debug, Clone)]
pub(crate) struct StoredEntry {
    pub posted: PostedEntry,
    pub line_ids: Vec<EntryLineId>,
    pub ledger_ids: Vec<LedgerId>,
}

impl EntryRepository {
    /// Creates a new entry repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, cache: BalanceCache, budget_policy: BudgetPolicy) -> Self {
        Self {
            db,
            cache,
            budget_policy,
        }
    }

    /// Validates and stores an entry.
    ///
    /// The entry is stored PENDING, or APPROVED when the actor auto-approves.
    /// Budget overruns under the warn policy come back in
    /// [`PostedEntry::budget_warnings`].
    ///
    /// # Errors
    ///
    /// Returns the first failing posting rule as a `LedgerError`; nothing is
    /// written in that case.
    pub async fn post(&self, temple_id: TempleId, actor: &Actor, input: PostEntryInput) -> Result<PostedEntry, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let stored = post_in(&txn, temple_id, actor, &input, self.budget_policy, None).await?;
        txn.commit().await.map_err(db_err)?;

        let posted = stored.posted;
        if posted.status.affects_balances() {
            self.cache.invalidate_ledgers(temple_id, &stored.ledger_ids, input.year_id);
        }
        for warning in &posted.budget_warnings {
            warn!(
                temple_id = %temple_id,
                entry_id = %posted.entry_id,
                ledger_id = %warning.ledger_id,
                overrun = %warning.overrun,
                "Budget exceeded"
            );
        }
        info!(
            temple_id = %temple_id,
            entry_id = %posted.entry_id,
            kind = %input.kind,
            status = %posted.status,
            "Entry posted"
        );
        Ok(posted)
    }

    /// Replaces the content of a PENDING entry.
    ///
    /// # Errors
    ///
    /// Returns `NotEditable` unless the entry is PENDING, or any posting rule
    /// failure for the new content.
    pub async fn update(
        &self,
        temple_id: TempleId,
        entry_id: EntryId,
        input: PostEntryInput,
    ) -> Result<PostedEntry, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let header = lock_entry(&txn, temple_id, entry_id).await?;
        EntryService::ensure_editable(header.status.into())?;

        let validated = validate_in(&txn, temple_id, &input, self.budget_policy, false).await?;

        entry_lines::Entity::delete_many()
            .filter(entry_lines::Column::EntryId.eq(entry_id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        insert_lines(&txn, entry_id, &validated).await?;

        let mut active: entries::ActiveModel = header.into();
        active.kind = Set(EntryKind::from(input.kind));
        active.year_id = Set(input.year_id.into_inner());
        active.entry_date = Set(input.entry_date);
        active.narration = Set(input.narration.clone());
        active.original_reference = Set(input.original_reference.clone());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, entry_id = %entry_id, "Entry updated");

        Ok(PostedEntry {
            entry_id,
            status: EntryStatus::Pending,
            totals: validated.totals,
            budget_warnings: validated.budget_warnings,
        })
    }

    /// Deletes a PENDING entry.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` or `NotEditable`.
    pub async fn delete(&self, temple_id: TempleId, entry_id: EntryId) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let header = lock_entry(&txn, temple_id, entry_id).await?;
        EntryService::ensure_editable(header.status.into())?;

        entry_lines::Entity::delete_many()
            .filter(entry_lines::Column::EntryId.eq(entry_id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        entries::Entity::delete_by_id(entry_id.into_inner())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, entry_id = %entry_id, "Entry deleted");
        Ok(())
    }

    /// Cancels an APPROVED entry and posts its replacement in one transaction.
    ///
    /// The replacement links back through `replaces` and must stay in the
    /// same accounting year.
    ///
    /// # Errors
    ///
    /// Returns the cancellation failure (`InvalidTransition`,
    /// `NotAuthorized`, `ClosedPeriod`, `PeriodLocked` for an original dated
    /// inside a locked reconciliation) or any posting rule failure of the
    /// replacement. Either way the original stays APPROVED.
    pub async fn amend(
        &self,
        temple_id: TempleId,
        actor: &Actor,
        entry_id: EntryId,
        reason: String,
        input: PostEntryInput,
    ) -> Result<PostedEntry, WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let header = lock_entry(&txn, temple_id, entry_id).await?;
        let original_year = AccountingYearId::from_uuid(header.year_id);
        EntryService::ensure_amendable(header.status.into(), original_year, input.year_id)?;

        let year = queries::find_year(&txn, temple_id, original_year, RowLock::Shared)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::YearNotFound(original_year))?;
        let action = WorkflowService::cancel(header.status.into(), actor, original_year, year.status.into(), reason)?;
        let original_ledgers = entry_ledgers(&txn, entry_id).await?;
        ensure_unlocked_in(&txn, temple_id, &header, &original_ledgers).await?;
        apply_action(&txn, header, &action).await?;

        let stored = post_in(&txn, temple_id, actor, &input, self.budget_policy, Some(entry_id)).await?;
        txn.commit().await.map_err(db_err)?;

        self.cache.invalidate_ledgers(temple_id, &original_ledgers, original_year);
        if stored.posted.status.affects_balances() {
            self.cache.invalidate_ledgers(temple_id, &stored.ledger_ids, input.year_id);
        }
        info!(
            temple_id = %temple_id,
            entry_id = %entry_id,
            replacement_id = %stored.posted.entry_id,
            "Entry amended"
        );
        Ok(stored.posted)
    }

    /// Fetches an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if the entry does not exist in this temple.
    pub async fn get(&self, temple_id: TempleId, entry_id: EntryId) -> Result<Entry, LedgerError> {
        let header = entries::Entity::find_by_id(entry_id.into_inner())
            .filter(entries::Column::TempleId.eq(temple_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        let lines = entry_lines::Entity::find()
            .filter(entry_lines::Column::EntryId.eq(entry_id.into_inner()))
            .order_by_asc(entry_lines::Column::LineNo)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(entry_from_models(header, lines))
    }

    /// Lists entries matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        temple_id: TempleId,
        filter: &EntryFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Entry>, LedgerError> {
        let mut query = entries::Entity::find().filter(entries::Column::TempleId.eq(temple_id.into_inner()));

        if let Some(status) = filter.status {
            query = query.filter(entries::Column::Status.eq(DbEntryStatus::from(status)));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(entries::Column::Kind.eq(EntryKind::from(kind)));
        }
        if let Some(year_id) = filter.year_id {
            query = query.filter(entries::Column::YearId.eq(year_id.into_inner()));
        }
        if let Some(from) = filter.from {
            query = query.filter(entries::Column::EntryDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(entries::Column::EntryDate.lte(to));
        }
        if let Some(ledger_id) = filter.ledger_id {
            query = query
                .join(JoinType::InnerJoin, entries::Relation::EntryLines.def())
                .filter(entry_lines::Column::LedgerId.eq(ledger_id.into_inner()))
                .distinct();
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let headers = query
            .order_by_desc(entries::Column::EntryDate)
            .order_by_desc(entries::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let ids: Vec<uuid::Uuid> = headers.iter().map(|h| h.id).collect();
        let mut lines_by_entry: HashMap<uuid::Uuid, Vec<entry_lines::Model>> = HashMap::new();
        if !ids.is_empty() {
            let lines = entry_lines::Entity::find()
                .filter(entry_lines::Column::EntryId.is_in(ids))
                .order_by_asc(entry_lines::Column::LineNo)
                .all(&self.db)
                .await
                .map_err(db_err)?;
            for line in lines {
                lines_by_entry.entry(line.entry_id).or_default().push(line);
            }
        }

        let data = headers
            .into_iter()
            .map(|h| {
                let lines = lines_by_entry.remove(&h.id).unwrap_or_default();
                entry_from_models(h, lines)
            })
            .collect();

        Ok(PageResponse::new(data, page.page, page.page_size(), total))
    }
}

/// Validates `input` against the store as seen by `conn`.
///
/// With `approving` set under the strict policy, the touched expense ledgers
/// are locked so that concurrent approvals check budgets one at a time.
async fn validate_in<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    input: &PostEntryInput,
    policy: BudgetPolicy,
    approving: bool,
) -> Result<ValidatedEntry, LedgerError> {
    let year: AccountingYear = queries::find_year(conn, temple_id, input.year_id, RowLock::Shared)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::YearNotFound(input.year_id))?
        .into();
    EntryService::validate_year(input, &year)?;

    let mut ledger_ids: Vec<LedgerId> = Vec::with_capacity(input.lines.len());
    for line in &input.lines {
        if !ledger_ids.contains(&line.ledger_id) {
            ledger_ids.push(line.ledger_id);
        }
    }

    let ledgers = queries::ledgers_by_ids(conn, temple_id, &ledger_ids, RowLock::None)
        .await
        .map_err(db_err)?;
    let expense_ids: Vec<LedgerId> = ledgers
        .iter()
        .filter(|l| l.is_expense_classified())
        .map(|l| l.id)
        .collect();
    if approving && policy.is_strict() && !expense_ids.is_empty() {
        queries::ledgers_by_ids(conn, temple_id, &expense_ids, RowLock::Exclusive)
            .await
            .map_err(db_err)?;
    }

    let by_id: HashMap<LedgerId, Ledger> = ledgers.into_iter().map(|l| (l.id, l)).collect();
    let locked = queries::locked_periods(conn, temple_id, &ledger_ids)
        .await
        .map_err(db_err)?;
    let positions = queries::budget_positions(conn, temple_id, input.year_id, &expense_ids)
        .await
        .map_err(db_err)?;

    let ctx = PostingContext {
        year: &year,
        locked_periods: &locked,
        budget_policy: policy,
    };
    EntryService::validate(
        input,
        &ctx,
        |id| by_id.get(&id),
        |id| positions.get(&id).copied().unwrap_or_default(),
    )
}

/// Validates and writes an entry on `conn` without committing.
pub(crate) async fn post_in<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    actor: &Actor,
    input: &PostEntryInput,
    policy: BudgetPolicy,
    replaces: Option<EntryId>,
) -> Result<StoredEntry, LedgerError> {
    let status = WorkflowService::initial_status(actor);
    let validated = validate_in(conn, temple_id, input, policy, status == EntryStatus::Approved).await?;

    let entry_id = EntryId::new();
    let now = Utc::now();
    let approved = status == EntryStatus::Approved;
    entries::ActiveModel {
        id: Set(entry_id.into_inner()),
        temple_id: Set(temple_id.into_inner()),
        year_id: Set(input.year_id.into_inner()),
        kind: Set(input.kind.into()),
        entry_date: Set(input.entry_date),
        status: Set(status.into()),
        narration: Set(input.narration.clone()),
        original_reference: Set(input.original_reference.clone()),
        created_by: Set(actor.id.into_inner()),
        approved_by: Set(approved.then(|| actor.id.into_inner())),
        decision_note: Set(None),
        decided_at: Set(approved.then(|| now.into())),
        cancelled_by: Set(None),
        cancelled_at: Set(None),
        cancel_reason: Set(None),
        replaces: Set(replaces.map(EntryId::into_inner)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    let line_ids = insert_lines(conn, entry_id, &validated).await?;
    let mut ledger_ids: Vec<LedgerId> = Vec::with_capacity(validated.lines.len());
    for line in &validated.lines {
        if !ledger_ids.contains(&line.ledger_id) {
            ledger_ids.push(line.ledger_id);
        }
    }

    Ok(StoredEntry {
        posted: PostedEntry {
            entry_id,
            status,
            totals: validated.totals,
            budget_warnings: validated.budget_warnings,
        },
        line_ids,
        ledger_ids,
    })
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    entry_id: EntryId,
    validated: &ValidatedEntry,
) -> Result<Vec<EntryLineId>, LedgerError> {
    let mut ids = Vec::with_capacity(validated.lines.len());
    let models: Vec<entry_lines::ActiveModel> = validated
        .lines
        .iter()
        .map(|line| {
            let id = EntryLineId::new();
            ids.push(id);
            entry_lines::ActiveModel {
                id: Set(id.into_inner()),
                entry_id: Set(entry_id.into_inner()),
                ledger_id: Set(line.ledger_id.into_inner()),
                line_no: Set(i32::try_from(line.line_no).unwrap_or(i32::MAX)),
                debit: Set(line.debit()),
                credit: Set(line.credit()),
                narration: Set(line.narration.clone()),
                cost_center: Set(line.cost_center.clone()),
                reference_number: Set(line.reference_number.clone()),
            }
        })
        .collect();

    entry_lines::Entity::insert_many(models).exec(conn).await.map_err(db_err)?;
    Ok(ids)
}

/// Loads an entry header under `FOR UPDATE`.
pub(crate) async fn lock_entry<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    entry_id: EntryId,
) -> Result<entries::Model, LedgerError> {
    entries::Entity::find_by_id(entry_id.into_inner())
        .filter(entries::Column::TempleId.eq(temple_id.into_inner()))
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::EntryNotFound(entry_id))
}

/// Ledgers touched by a stored entry.
pub(crate) async fn entry_ledgers<C: ConnectionTrait>(conn: &C, entry_id: EntryId) -> Result<Vec<LedgerId>, LedgerError> {
    let ids: Vec<uuid::Uuid> = entry_lines::Entity::find()
        .filter(entry_lines::Column::EntryId.eq(entry_id.into_inner()))
        .select_only()
        .column(entry_lines::Column::LedgerId)
        .distinct()
        .into_tuple()
        .all(conn)
        .await
        .map_err(db_err)?;
    Ok(ids.into_iter().map(LedgerId::from_uuid).collect())
}

/// Rejects a status change of an entry whose date falls inside a locked
/// reconciliation period of any of its ledgers.
pub(crate) async fn ensure_unlocked_in<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    header: &entries::Model,
    ledger_ids: &[LedgerId],
) -> Result<(), LedgerError> {
    let locked = queries::locked_periods(conn, temple_id, ledger_ids)
        .await
        .map_err(db_err)?;
    EntryService::ensure_unlocked(ledger_ids.iter().copied(), header.entry_date, &locked)
}

/// Writes a workflow decision onto the entry header.
pub(crate) async fn apply_action<C: ConnectionTrait>(
    conn: &C,
    header: entries::Model,
    action: &WorkflowAction,
) -> Result<(), LedgerError> {
    let mut active: entries::ActiveModel = header.into();
    active.status = Set(action.new_status().into());
    match action {
        WorkflowAction::Approve {
            approved_by,
            approved_at,
            note,
            ..
        } => {
            active.approved_by = Set(Some(approved_by.into_inner()));
            active.decided_at = Set(Some((*approved_at).into()));
            active.decision_note = Set(note.clone());
        }
        WorkflowAction::Reject {
            rejected_at,
            note,
            ..
        } => {
            active.decided_at = Set(Some((*rejected_at).into()));
            active.decision_note = Set(note.clone());
        }
        WorkflowAction::Cancel {
            cancelled_by,
            cancelled_at,
            reason,
            ..
        } => {
            active.cancelled_by = Set(Some(cancelled_by.into_inner()));
            active.cancelled_at = Set(Some((*cancelled_at).into()));
            active.cancel_reason = Set(Some(reason.clone()));
        }
    }
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await.map_err(db_err)?;
    Ok(())
}
