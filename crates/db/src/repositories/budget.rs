//! Budget repository: allocations, their lifecycle, and the variance report.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use devalaya_core::budget::{Budget, BudgetAction, BudgetError, BudgetService, BudgetStatus, CreateBudgetInput, VarianceReport};
use devalaya_core::chart::{AccountNature, Ledger};
use devalaya_shared::types::{AccountingYearId, ActorId, BudgetId, LedgerId, TempleId};

use super::queries::{self, RowLock};
use crate::entities::budgets;
use crate::entities::sea_orm_active_enums::BudgetStatus as DbBudgetStatus;

/// Budget repository.
#[derive(Debug, Clone)]
pub struct BudgetRepository {
    db: DatabaseConnection,
}

fn db_err(e: DbErr) -> BudgetError {
    BudgetError::Database(e.to_string())
}

impl BudgetRepository {
    /// Creates a new budget repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a DRAFT budget.
    ///
    /// # Errors
    ///
    /// Returns `LedgerNotFound`, `YearNotFound`, `NotBudgetable` for
    /// ledgers outside INCOME/EXPENSE, or `NegativeAmount`.
    pub async fn create(
        &self,
        temple_id: TempleId,
        created_by: ActorId,
        input: CreateBudgetInput,
    ) -> Result<Budget, BudgetError> {
        let ledger = self.ledger(temple_id, input.ledger_id).await?;
        BudgetService::validate_allocation(&ledger, input.allocated)?;
        queries::find_year(&self.db, temple_id, input.year_id, RowLock::None)
            .await
            .map_err(db_err)?
            .ok_or(BudgetError::YearNotFound(input.year_id))?;

        let budget = Budget {
            id: BudgetId::new(),
            ledger_id: input.ledger_id,
            year_id: input.year_id,
            allocated: input.allocated,
            status: BudgetStatus::Draft,
            notes: input.notes,
        };

        let now = Utc::now().into();
        budgets::ActiveModel {
            id: Set(budget.id.into_inner()),
            temple_id: Set(temple_id.into_inner()),
            ledger_id: Set(budget.ledger_id.into_inner()),
            year_id: Set(budget.year_id.into_inner()),
            allocated: Set(budget.allocated),
            status: Set(budget.status.into()),
            notes: Set(budget.notes.clone()),
            created_by: Set(created_by.into_inner()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        info!(
            temple_id = %temple_id,
            budget_id = %budget.id,
            ledger_id = %budget.ledger_id,
            allocated = %budget.allocated,
            "Budget created"
        );
        Ok(budget)
    }

    /// Changes the allocation or notes of a DRAFT budget.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `NotEditable`, or `NegativeAmount`.
    pub async fn update(
        &self,
        temple_id: TempleId,
        budget_id: BudgetId,
        allocated: Decimal,
        notes: Option<String>,
    ) -> Result<Budget, BudgetError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = lock_budget(&txn, temple_id, budget_id).await?;
        let mut budget = Budget::from(model.clone());
        BudgetService::ensure_editable(budget.status)?;
        let ledger = self.ledger(temple_id, budget.ledger_id).await?;
        BudgetService::validate_allocation(&ledger, allocated)?;

        let mut active: budgets::ActiveModel = model.into();
        active.allocated = Set(allocated);
        active.notes = Set(notes.clone());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        info!(temple_id = %temple_id, budget_id = %budget_id, allocated = %allocated, "Budget updated");
        budget.allocated = allocated;
        budget.notes = notes;
        Ok(budget)
    }

    /// Deletes a DRAFT budget.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `NotEditable`.
    pub async fn delete(&self, temple_id: TempleId, budget_id: BudgetId) -> Result<(), BudgetError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = lock_budget(&txn, temple_id, budget_id).await?;
        BudgetService::ensure_editable(model.status.into())?;

        budgets::Entity::delete_by_id(budget_id.into_inner())
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        info!(temple_id = %temple_id, budget_id = %budget_id, "Budget deleted");
        Ok(())
    }

    /// Moves a budget through DRAFT → SUBMITTED → APPROVED → CLOSED, or
    /// returns a SUBMITTED budget to DRAFT.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition`, or `AlreadyApproved` when another budget
    /// of the same ledger and year is APPROVED.
    pub async fn transition(
        &self,
        temple_id: TempleId,
        budget_id: BudgetId,
        action: BudgetAction,
    ) -> Result<Budget, BudgetError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = lock_budget(&txn, temple_id, budget_id).await?;
        let mut budget = Budget::from(model.clone());

        let approved_sibling = if action == BudgetAction::Approve {
            budgets::Entity::find()
                .filter(budgets::Column::TempleId.eq(temple_id.into_inner()))
                .filter(budgets::Column::LedgerId.eq(model.ledger_id))
                .filter(budgets::Column::YearId.eq(model.year_id))
                .filter(budgets::Column::Status.eq(DbBudgetStatus::Approved))
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(db_err)?
                .map(|m| BudgetId::from_uuid(m.id))
        } else {
            None
        };

        let new_status = BudgetService::transition(&budget, action, approved_sibling)?;
        let mut active: budgets::ActiveModel = model.into();
        active.status = Set(new_status.into());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        info!(
            temple_id = %temple_id,
            budget_id = %budget_id,
            from = %budget.status,
            to = %new_status,
            "Budget status changed"
        );
        budget.status = new_status;
        Ok(budget)
    }

    /// Fetches one budget.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`.
    pub async fn get(&self, temple_id: TempleId, budget_id: BudgetId) -> Result<Budget, BudgetError> {
        budgets::Entity::find_by_id(budget_id.into_inner())
            .filter(budgets::Column::TempleId.eq(temple_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(Budget::from)
            .ok_or(BudgetError::NotFound(budget_id))
    }

    /// Lists the budgets of a year.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, temple_id: TempleId, year_id: AccountingYearId) -> Result<Vec<Budget>, BudgetError> {
        Ok(budgets::Entity::find()
            .filter(budgets::Column::TempleId.eq(temple_id.into_inner()))
            .filter(budgets::Column::YearId.eq(year_id.into_inner()))
            .order_by_asc(budgets::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(Budget::from)
            .collect())
    }

    /// Budget-vs-actual report for a year.
    ///
    /// Actuals are the APPROVED debits of expense ledgers and the APPROVED
    /// credits of income ledgers. Closed budgets are reported too.
    ///
    /// # Errors
    ///
    /// Returns `YearNotFound` or a database error.
    pub async fn variance_report(
        &self,
        temple_id: TempleId,
        year_id: AccountingYearId,
    ) -> Result<VarianceReport, BudgetError> {
        queries::find_year(&self.db, temple_id, year_id, RowLock::None)
            .await
            .map_err(db_err)?
            .ok_or(BudgetError::YearNotFound(year_id))?;

        let budgets = self.list(temple_id, year_id).await?;
        let mut ledger_ids: Vec<LedgerId> = budgets.iter().map(|b| b.ledger_id).collect();
        ledger_ids.sort_by_key(|id| id.into_inner());
        ledger_ids.dedup();

        let ledgers: HashMap<LedgerId, Ledger> = queries::ledgers_by_ids(&self.db, temple_id, &ledger_ids, RowLock::None)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();
        let lines = queries::approved_lines(&self.db, temple_id, year_id, Some(&ledger_ids), None)
            .await
            .map_err(db_err)?;

        let mut actuals: HashMap<LedgerId, Decimal> = HashMap::new();
        for line in &lines {
            let Some(ledger) = ledgers.get(&line.ledger_id) else {
                continue;
            };
            let amount = if ledger.nature == AccountNature::Income {
                line.credit
            } else {
                line.debit
            };
            *actuals.entry(line.ledger_id).or_default() += amount;
        }

        let rows: Vec<(Budget, Ledger, Decimal)> = budgets
            .into_iter()
            .filter_map(|budget| {
                let ledger = ledgers.get(&budget.ledger_id)?.clone();
                let actual = actuals.get(&budget.ledger_id).copied().unwrap_or_default();
                Some((budget, ledger, actual))
            })
            .collect();

        Ok(BudgetService::variance_report(year_id, &rows))
    }

    async fn ledger(&self, temple_id: TempleId, ledger_id: LedgerId) -> Result<Ledger, BudgetError> {
        queries::ledgers_by_ids(&self.db, temple_id, &[ledger_id], RowLock::None)
            .await
            .map_err(db_err)?
            .into_iter()
            .next()
            .ok_or(BudgetError::LedgerNotFound(ledger_id))
    }
}

async fn lock_budget<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    budget_id: BudgetId,
) -> Result<budgets::Model, BudgetError> {
    budgets::Entity::find_by_id(budget_id.into_inner())
        .filter(budgets::Column::TempleId.eq(temple_id.into_inner()))
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(BudgetError::NotFound(budget_id))
}
