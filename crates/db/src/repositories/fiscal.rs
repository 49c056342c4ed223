//! Accounting year repository.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use sea_orm::sea_query::Expr;
use tracing::info;

use devalaya_core::fiscal::{AccountingYear, FiscalError, YearService, YearStatus};
use devalaya_shared::types::{AccountingYearId, TempleId};

use super::queries::{self, RowLock};
use crate::entities::accounting_years;

/// Accounting year repository.
#[derive(Debug, Clone)]
pub struct FiscalRepository {
    db: DatabaseConnection,
}

fn db_err(e: DbErr) -> FiscalError {
    FiscalError::Database(e.to_string())
}

impl FiscalRepository {
    /// Creates a new fiscal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an OPEN, inactive accounting year.
    ///
    /// The range is checked against every existing year of the temple. The
    /// existing rows are locked so two concurrent creations cannot both pass
    /// the check; the table's exclusion constraint backs this up.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` or `OverlappingYear`.
    pub async fn create(
        &self,
        temple_id: TempleId,
        name: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AccountingYear, FiscalError> {
        YearService::validate_date_range(start_date, end_date)?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let existing: Vec<AccountingYear> = accounting_years::Entity::find()
            .filter(accounting_years::Column::TempleId.eq(temple_id.into_inner()))
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(AccountingYear::from)
            .collect();
        YearService::check_overlap(start_date, end_date, &existing)?;

        let id = AccountingYearId::new();
        let now = Utc::now().into();
        accounting_years::ActiveModel {
            id: Set(id.into_inner()),
            temple_id: Set(temple_id.into_inner()),
            name: Set(name.clone()),
            start_date: Set(start_date),
            end_date: Set(end_date),
            status: Set(YearStatus::Open.into()),
            is_active: Set(false),
            closed_by: Set(None),
            closed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, year_id = %id, name = %name, "Accounting year created");

        Ok(AccountingYear {
            id,
            name,
            start_date,
            end_date,
            status: YearStatus::Open,
            is_active: false,
        })
    }

    /// Makes `year_id` the temple's only active year. The previously active
    /// year keeps its status.
    ///
    /// # Errors
    ///
    /// Returns `YearNotFound` or `CannotActivateClosed`.
    pub async fn set_active(&self, temple_id: TempleId, year_id: AccountingYearId) -> Result<AccountingYear, FiscalError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = queries::find_year(&txn, temple_id, year_id, RowLock::Exclusive)
            .await
            .map_err(db_err)?
            .ok_or(FiscalError::YearNotFound(year_id))?;
        let mut year = AccountingYear::from(model.clone());
        YearService::ensure_activatable(&year)?;

        accounting_years::Entity::update_many()
            .col_expr(accounting_years::Column::IsActive, Expr::value(false))
            .col_expr(accounting_years::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounting_years::Column::TempleId.eq(temple_id.into_inner()))
            .filter(accounting_years::Column::IsActive.eq(true))
            .filter(accounting_years::Column::Id.ne(year_id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let mut active: accounting_years::ActiveModel = model.into();
        active.is_active = Set(true);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, year_id = %year_id, "Active accounting year changed");

        year.is_active = true;
        Ok(year)
    }

    /// Fetches one year.
    ///
    /// # Errors
    ///
    /// Returns `YearNotFound`.
    pub async fn get(&self, temple_id: TempleId, year_id: AccountingYearId) -> Result<AccountingYear, FiscalError> {
        queries::find_year(&self.db, temple_id, year_id, RowLock::None)
            .await
            .map_err(db_err)?
            .map(AccountingYear::from)
            .ok_or(FiscalError::YearNotFound(year_id))
    }

    /// Lists every year of the temple by start date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, temple_id: TempleId) -> Result<Vec<AccountingYear>, FiscalError> {
        Ok(accounting_years::Entity::find()
            .filter(accounting_years::Column::TempleId.eq(temple_id.into_inner()))
            .order_by_asc(accounting_years::Column::StartDate)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(AccountingYear::from)
            .collect())
    }

    /// The temple's active year, if one is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn active(&self, temple_id: TempleId) -> Result<Option<AccountingYear>, FiscalError> {
        Ok(accounting_years::Entity::find()
            .filter(accounting_years::Column::TempleId.eq(temple_id.into_inner()))
            .filter(accounting_years::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(AccountingYear::from))
    }

    /// The year receiving carry-forward balances from `year_id`.
    ///
    /// # Errors
    ///
    /// Returns `YearNotFound` for an unknown `year_id`.
    pub async fn next_year(
        &self,
        temple_id: TempleId,
        year_id: AccountingYearId,
    ) -> Result<Option<AccountingYear>, FiscalError> {
        let years = self.list(temple_id).await?;
        let year = years
            .iter()
            .find(|y| y.id == year_id)
            .ok_or(FiscalError::YearNotFound(year_id))?;
        Ok(YearService::next_year(year, &years).cloned())
    }
}
