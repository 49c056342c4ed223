//! Read helpers shared by the repositories.
//!
//! Every helper takes any connection, so it runs equally on the pool or
//! inside the caller's transaction.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use uuid::Uuid;

use devalaya_core::budget::BudgetPosition;
use devalaya_core::chart::Ledger;
use devalaya_core::ledger::{ApprovedLine, BalanceEngine, BalanceSnapshot, LockedPeriod};
use devalaya_shared::types::{AccountingYearId, EntryId, EntryLineId, LedgerId, TempleId};

use crate::entities::sea_orm_active_enums::{BudgetStatus, EntryKind, EntryStatus, ReconciliationStatus};
use crate::entities::{
    accounting_years, budgets, entries, entry_lines, ledgers, opening_balances, reconciliation_sessions,
};

/// Row lock taken while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowLock {
    None,
    /// `FOR SHARE`
    Shared,
    /// `FOR UPDATE`
    Exclusive,
}

fn ids<T>(values: &[T], f: impl Fn(&T) -> Uuid) -> Vec<Uuid> {
    values.iter().map(f).collect()
}

pub(crate) async fn find_year<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    year_id: AccountingYearId,
    lock: RowLock,
) -> Result<Option<accounting_years::Model>, DbErr> {
    let query = accounting_years::Entity::find_by_id(year_id.into_inner())
        .filter(accounting_years::Column::TempleId.eq(temple_id.into_inner()));
    let query = match lock {
        RowLock::None => query,
        RowLock::Shared => query.lock_shared(),
        RowLock::Exclusive => query.lock_exclusive(),
    };
    query.one(conn).await
}

/// Loads the given ledgers, locking them in id order when asked so that
/// concurrent lockers cannot deadlock.
pub(crate) async fn ledgers_by_ids<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    ledger_ids: &[LedgerId],
    lock: RowLock,
) -> Result<Vec<Ledger>, DbErr> {
    if ledger_ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = ledgers::Entity::find()
        .filter(ledgers::Column::TempleId.eq(temple_id.into_inner()))
        .filter(ledgers::Column::Id.is_in(ids(ledger_ids, |id| id.into_inner())))
        .order_by_asc(ledgers::Column::Id);
    let query = match lock {
        RowLock::None => query,
        RowLock::Shared => query.lock_shared(),
        RowLock::Exclusive => query.lock_exclusive(),
    };
    Ok(query.all(conn).await?.into_iter().map(Ledger::from).collect())
}

pub(crate) async fn all_ledgers<C: ConnectionTrait>(conn: &C, temple_id: TempleId) -> Result<Vec<Ledger>, DbErr> {
    Ok(ledgers::Entity::find()
        .filter(ledgers::Column::TempleId.eq(temple_id.into_inner()))
        .order_by_asc(ledgers::Column::Code)
        .all(conn)
        .await?
        .into_iter()
        .map(Ledger::from)
        .collect())
}

#[derive(Debug, FromQueryResult)]
struct ApprovedLineRow {
    id: Uuid,
    entry_id: Uuid,
    ledger_id: Uuid,
    line_no: i32,
    debit: Decimal,
    credit: Decimal,
    narration: Option<String>,
    entry_date: NaiveDate,
    entry_kind: EntryKind,
    entry_narration: Option<String>,
}

/// APPROVED lines of the year in posting order, optionally restricted to
/// some ledgers and cut off at `as_of`.
pub(crate) async fn approved_lines<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    year_id: AccountingYearId,
    ledger_ids: Option<&[LedgerId]>,
    as_of: Option<NaiveDate>,
) -> Result<Vec<ApprovedLine>, DbErr> {
    let mut query = entry_lines::Entity::find()
        .join(JoinType::InnerJoin, entry_lines::Relation::Entries.def())
        .filter(entries::Column::TempleId.eq(temple_id.into_inner()))
        .filter(entries::Column::YearId.eq(year_id.into_inner()))
        .filter(entries::Column::Status.eq(EntryStatus::Approved))
        .column_as(entries::Column::EntryDate, "entry_date")
        .column_as(entries::Column::Kind, "entry_kind")
        .column_as(entries::Column::Narration, "entry_narration");

    if let Some(ledger_ids) = ledger_ids {
        query = query.filter(entry_lines::Column::LedgerId.is_in(ids(ledger_ids, |id| id.into_inner())));
    }
    if let Some(as_of) = as_of {
        query = query.filter(entries::Column::EntryDate.lte(as_of));
    }

    let rows: Vec<ApprovedLineRow> = query
        .order_by_asc(entries::Column::EntryDate)
        .order_by_asc(entries::Column::CreatedAt)
        .order_by_asc(entry_lines::Column::EntryId)
        .order_by_asc(entry_lines::Column::LineNo)
        .into_model::<ApprovedLineRow>()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| ApprovedLine {
            entry_id: EntryId::from_uuid(row.entry_id),
            line_id: EntryLineId::from_uuid(row.id),
            ledger_id: LedgerId::from_uuid(row.ledger_id),
            entry_date: row.entry_date,
            kind: row.entry_kind.into(),
            line_no: u32::try_from(row.line_no).unwrap_or_default(),
            debit: row.debit,
            credit: row.credit,
            narration: row.narration.or(row.entry_narration),
        })
        .collect())
}

/// Budget position of each ledger: APPROVED allocation and APPROVED debit spend.
pub(crate) async fn budget_positions<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    year_id: AccountingYearId,
    ledger_ids: &[LedgerId],
) -> Result<HashMap<LedgerId, BudgetPosition>, DbErr> {
    let mut positions: HashMap<LedgerId, BudgetPosition> =
        ledger_ids.iter().map(|id| (*id, BudgetPosition::default())).collect();
    if ledger_ids.is_empty() {
        return Ok(positions);
    }

    let allocations: Vec<(Uuid, Decimal)> = budgets::Entity::find()
        .filter(budgets::Column::TempleId.eq(temple_id.into_inner()))
        .filter(budgets::Column::YearId.eq(year_id.into_inner()))
        .filter(budgets::Column::Status.eq(BudgetStatus::Approved))
        .filter(budgets::Column::LedgerId.is_in(ids(ledger_ids, |id| id.into_inner())))
        .select_only()
        .column(budgets::Column::LedgerId)
        .column(budgets::Column::Allocated)
        .into_tuple()
        .all(conn)
        .await?;
    for (ledger_id, allocated) in allocations {
        if let Some(position) = positions.get_mut(&LedgerId::from_uuid(ledger_id)) {
            position.allocated = Some(allocated);
        }
    }

    let debits: Vec<(Uuid, Decimal)> = entry_lines::Entity::find()
        .join(JoinType::InnerJoin, entry_lines::Relation::Entries.def())
        .filter(entries::Column::TempleId.eq(temple_id.into_inner()))
        .filter(entries::Column::YearId.eq(year_id.into_inner()))
        .filter(entries::Column::Status.eq(EntryStatus::Approved))
        .filter(entry_lines::Column::LedgerId.is_in(ids(ledger_ids, |id| id.into_inner())))
        .filter(entry_lines::Column::Debit.gt(Decimal::ZERO))
        .select_only()
        .column(entry_lines::Column::LedgerId)
        .column(entry_lines::Column::Debit)
        .into_tuple()
        .all(conn)
        .await?;
    for (ledger_id, debit) in debits {
        if let Some(position) = positions.get_mut(&LedgerId::from_uuid(ledger_id)) {
            position.spent += debit;
        }
    }

    Ok(positions)
}

/// Periods of LOCKED reconciliation sessions on the given ledgers.
pub(crate) async fn locked_periods<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    ledger_ids: &[LedgerId],
) -> Result<Vec<LockedPeriod>, DbErr> {
    if ledger_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sessions = reconciliation_sessions::Entity::find()
        .filter(reconciliation_sessions::Column::TempleId.eq(temple_id.into_inner()))
        .filter(reconciliation_sessions::Column::Status.eq(ReconciliationStatus::Locked))
        .filter(reconciliation_sessions::Column::LedgerId.is_in(ids(ledger_ids, |id| id.into_inner())))
        .all(conn)
        .await?;

    Ok(sessions
        .into_iter()
        .map(|s| LockedPeriod {
            ledger_id: LedgerId::from_uuid(s.ledger_id),
            from: s.period_from,
            to: s.period_to,
        })
        .collect())
}

/// Carried-forward openings written by the previous year's closing.
pub(crate) async fn carried_openings<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    year_id: AccountingYearId,
) -> Result<HashMap<LedgerId, Decimal>, DbErr> {
    let rows: Vec<(Uuid, Decimal)> = opening_balances::Entity::find()
        .filter(opening_balances::Column::TempleId.eq(temple_id.into_inner()))
        .filter(opening_balances::Column::YearId.eq(year_id.into_inner()))
        .select_only()
        .column(opening_balances::Column::LedgerId)
        .column(opening_balances::Column::Amount)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|(id, amount)| (LedgerId::from_uuid(id), amount)).collect())
}

/// Balance snapshot of every ledger of the temple for a year.
pub(crate) async fn snapshots<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    year_id: AccountingYearId,
    as_of: Option<NaiveDate>,
) -> Result<Vec<(Ledger, BalanceSnapshot)>, DbErr> {
    let ledgers = all_ledgers(conn, temple_id).await?;
    let openings = carried_openings(conn, temple_id, year_id).await?;
    let lines = approved_lines(conn, temple_id, year_id, None, as_of).await?;

    let mut totals: HashMap<LedgerId, (Decimal, Decimal)> = HashMap::new();
    for line in &lines {
        let entry = totals.entry(line.ledger_id).or_default();
        entry.0 += line.debit;
        entry.1 += line.credit;
    }

    Ok(ledgers
        .into_iter()
        .map(|ledger| {
            let opening = BalanceEngine::opening(&ledger, year_id, openings.get(&ledger.id).copied());
            let (debit, credit) = totals.get(&ledger.id).copied().unwrap_or_default();
            let snapshot = BalanceEngine::snapshot(ledger.nature, opening, debit, credit);
            (ledger, snapshot)
        })
        .collect())
}
