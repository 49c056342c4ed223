//! Chart of accounts repository.
//!
//! Every mutation takes the temple's chart lock, loads the chart, applies
//! the change to the in-memory arena (which validates natures, codes, and
//! cycles), then writes the affected row in the same transaction. The lock is
//! a transaction-scoped advisory lock, so two mutations of one temple's chart
//! run one after the other and each validates against the other's result.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::info;

use devalaya_core::chart::{AccountGroup, AccountNature, ChartError, ChartOfAccounts, GroupNode, Ledger, LedgerType};
use devalaya_shared::types::{AccountingYearId, GroupId, LedgerId, TempleId};

use crate::entities::{
    account_groups, budgets, entry_lines, ledger_closings, ledgers, opening_balances, reconciliation_sessions,
};

/// Input for creating an account group.
#[derive(Debug, Clone)]
pub struct CreateGroupInput {
    /// Code, unique per temple.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Parent group.
    pub parent_id: Option<GroupId>,
    /// Nature; must match the parent's.
    pub nature: AccountNature,
}

/// Input for creating a ledger.
#[derive(Debug, Clone)]
pub struct CreateLedgerInput {
    /// Code, unique per temple.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Owning group; the ledger takes its nature.
    pub group_id: GroupId,
    /// Classification.
    pub ledger_type: LedgerType,
    /// Opening balance in the normal direction.
    pub opening_balance: Decimal,
    /// Year the opening balance applies to.
    pub opening_year_id: Option<AccountingYearId>,
}

/// Chart of accounts repository.
#[derive(Debug, Clone)]
pub struct ChartRepository {
    db: DatabaseConnection,
}

fn db_err(e: DbErr) -> ChartError {
    ChartError::Database(e.to_string())
}

impl ChartRepository {
    /// Creates a new chart repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads the whole chart of a temple.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load(&self, temple_id: TempleId) -> Result<ChartOfAccounts, ChartError> {
        load_chart(&self.db, temple_id).await
    }

    /// Returns the hierarchical tree, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn tree(&self, temple_id: TempleId) -> Result<Vec<GroupNode>, ChartError> {
        Ok(self.load(temple_id).await?.tree())
    }

    /// Fetches one ledger.
    ///
    /// # Errors
    ///
    /// Returns `LedgerNotFound` if the ledger does not exist in this temple.
    pub async fn get_ledger(&self, temple_id: TempleId, ledger_id: LedgerId) -> Result<Ledger, ChartError> {
        ledgers::Entity::find_by_id(ledger_id.into_inner())
            .filter(ledgers::Column::TempleId.eq(temple_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(Ledger::from)
            .ok_or(ChartError::LedgerNotFound(ledger_id))
    }

    // ========================================================================
    // Groups
    // ========================================================================

    /// Creates an account group.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCode`, `GroupNotFound` for an unknown parent, or
    /// `NatureMismatch` when the nature differs from the parent's.
    pub async fn create_group(&self, temple_id: TempleId, input: CreateGroupInput) -> Result<AccountGroup, ChartError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut chart = lock_chart(&txn, temple_id).await?;

        let group = AccountGroup {
            id: GroupId::new(),
            code: input.code,
            name: input.name,
            parent_id: input.parent_id,
            nature: input.nature,
        };
        chart.add_group(group.clone())?;

        let now = Utc::now().into();
        account_groups::ActiveModel {
            id: Set(group.id.into_inner()),
            temple_id: Set(temple_id.into_inner()),
            code: Set(group.code.clone()),
            name: Set(group.name.clone()),
            parent_id: Set(group.parent_id.map(GroupId::into_inner)),
            nature: Set(group.nature.into()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, group_id = %group.id, code = %group.code, "Account group created");
        Ok(group)
    }

    /// Renames a group or changes its code.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` or `DuplicateCode`.
    pub async fn update_group(
        &self,
        temple_id: TempleId,
        group_id: GroupId,
        code: String,
        name: String,
    ) -> Result<AccountGroup, ChartError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut chart = lock_chart(&txn, temple_id).await?;
        let group = chart.update_group(group_id, code, name)?.clone();

        let model = find_group(&txn, temple_id, group_id).await?;
        let mut active: account_groups::ActiveModel = model.into();
        active.code = Set(group.code.clone());
        active.name = Set(group.name.clone());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, group_id = %group_id, "Account group updated");
        Ok(group)
    }

    /// Moves a group under a new parent, or makes it a root.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` when the new parent is the group itself or one
    /// of its descendants, and `NatureMismatch` across natures.
    pub async fn move_group(
        &self,
        temple_id: TempleId,
        group_id: GroupId,
        new_parent: Option<GroupId>,
    ) -> Result<(), ChartError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut chart = lock_chart(&txn, temple_id).await?;
        chart.move_group(group_id, new_parent)?;

        let model = find_group(&txn, temple_id, group_id).await?;
        let mut active: account_groups::ActiveModel = model.into();
        active.parent_id = Set(new_parent.map(GroupId::into_inner));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, group_id = %group_id, "Account group moved");
        Ok(())
    }

    /// Deletes an empty group.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotEmpty` while child groups or ledgers remain.
    pub async fn delete_group(&self, temple_id: TempleId, group_id: GroupId) -> Result<(), ChartError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut chart = lock_chart(&txn, temple_id).await?;
        chart.remove_group(group_id)?;

        account_groups::Entity::delete_by_id(group_id.into_inner())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, group_id = %group_id, "Account group deleted");
        Ok(())
    }

    // ========================================================================
    // Ledgers
    // ========================================================================

    /// Creates a ledger under a group, taking the group's nature.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound`, `DuplicateCode`, or `IncompatibleLedgerType`.
    pub async fn create_ledger(&self, temple_id: TempleId, input: CreateLedgerInput) -> Result<Ledger, ChartError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut chart = lock_chart(&txn, temple_id).await?;
        let nature = chart
            .group(input.group_id)
            .map(|g| g.nature)
            .ok_or(ChartError::GroupNotFound(input.group_id))?;

        let ledger = Ledger {
            id: LedgerId::new(),
            code: input.code,
            name: input.name,
            group_id: input.group_id,
            ledger_type: input.ledger_type,
            nature,
            opening_balance: input.opening_balance,
            opening_year_id: input.opening_year_id,
            is_active: true,
        };
        chart.add_ledger(ledger.clone())?;

        let now = Utc::now().into();
        ledgers::ActiveModel {
            id: Set(ledger.id.into_inner()),
            temple_id: Set(temple_id.into_inner()),
            code: Set(ledger.code.clone()),
            name: Set(ledger.name.clone()),
            group_id: Set(ledger.group_id.into_inner()),
            ledger_type: Set(ledger.ledger_type.into()),
            nature: Set(ledger.nature.into()),
            opening_balance: Set(ledger.opening_balance),
            opening_year_id: Set(ledger.opening_year_id.map(AccountingYearId::into_inner)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(
            temple_id = %temple_id,
            ledger_id = %ledger.id,
            code = %ledger.code,
            ledger_type = %ledger.ledger_type,
            "Ledger created"
        );
        Ok(ledger)
    }

    /// Renames a ledger or changes its code. Entry lines only reference the
    /// ledger, so history follows.
    ///
    /// # Errors
    ///
    /// Returns `LedgerNotFound` or `DuplicateCode`.
    pub async fn update_ledger(
        &self,
        temple_id: TempleId,
        ledger_id: LedgerId,
        code: String,
        name: String,
    ) -> Result<Ledger, ChartError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut chart = lock_chart(&txn, temple_id).await?;
        let ledger = chart.update_ledger(ledger_id, code, name)?.clone();

        let model = find_ledger(&txn, temple_id, ledger_id).await?;
        let mut active: ledgers::ActiveModel = model.into();
        active.code = Set(ledger.code.clone());
        active.name = Set(ledger.name.clone());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, ledger_id = %ledger_id, "Ledger updated");
        Ok(ledger)
    }

    /// Moves a ledger to another group of the same nature.
    ///
    /// # Errors
    ///
    /// Returns `NatureMismatch` or `IncompatibleLedgerType`.
    pub async fn move_ledger(&self, temple_id: TempleId, ledger_id: LedgerId, group_id: GroupId) -> Result<(), ChartError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut chart = lock_chart(&txn, temple_id).await?;
        chart.move_ledger(ledger_id, group_id)?;

        let model = find_ledger(&txn, temple_id, ledger_id).await?;
        let mut active: ledgers::ActiveModel = model.into();
        active.group_id = Set(group_id.into_inner());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, ledger_id = %ledger_id, group_id = %group_id, "Ledger moved");
        Ok(())
    }

    /// Activates or deactivates a ledger. Inactive ledgers reject postings.
    ///
    /// # Errors
    ///
    /// Returns `LedgerNotFound`.
    pub async fn set_ledger_active(
        &self,
        temple_id: TempleId,
        ledger_id: LedgerId,
        is_active: bool,
    ) -> Result<Ledger, ChartError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut chart = lock_chart(&txn, temple_id).await?;
        chart.set_ledger_active(ledger_id, is_active)?;

        let model = find_ledger(&txn, temple_id, ledger_id).await?;
        let mut active: ledgers::ActiveModel = model.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, ledger_id = %ledger_id, is_active, "Ledger activation changed");
        Ok(Ledger::from(updated))
    }

    /// Deletes a ledger nothing references.
    ///
    /// # Errors
    ///
    /// Returns `ReferencedEntity` with the number of entry lines, budgets,
    /// reconciliation sessions, carried-forward openings, and closing markers
    /// pointing at the ledger.
    pub async fn delete_ledger(&self, temple_id: TempleId, ledger_id: LedgerId) -> Result<(), ChartError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut chart = lock_chart(&txn, temple_id).await?;

        let id = ledger_id.into_inner();
        let lines = entry_lines::Entity::find()
            .filter(entry_lines::Column::LedgerId.eq(id))
            .count(&txn)
            .await
            .map_err(db_err)?;
        let budgets = budgets::Entity::find()
            .filter(budgets::Column::LedgerId.eq(id))
            .count(&txn)
            .await
            .map_err(db_err)?;
        let sessions = reconciliation_sessions::Entity::find()
            .filter(reconciliation_sessions::Column::LedgerId.eq(id))
            .count(&txn)
            .await
            .map_err(db_err)?;
        let openings = opening_balances::Entity::find()
            .filter(opening_balances::Column::LedgerId.eq(id))
            .count(&txn)
            .await
            .map_err(db_err)?;
        let closings = ledger_closings::Entity::find()
            .filter(ledger_closings::Column::LedgerId.eq(id))
            .count(&txn)
            .await
            .map_err(db_err)?;

        chart.remove_ledger(ledger_id, lines + budgets + sessions + openings + closings)?;
        ledgers::Entity::delete_by_id(id).exec(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(temple_id = %temple_id, ledger_id = %ledger_id, "Ledger deleted");
        Ok(())
    }
}

/// Takes the temple's chart lock for the rest of the transaction, then loads
/// the chart.
async fn lock_chart(txn: &DatabaseTransaction, temple_id: TempleId) -> Result<ChartOfAccounts, ChartError> {
    let sql = format!("SELECT pg_advisory_xact_lock(hashtext('chart:{temple_id}'))");
    txn.execute_unprepared(&sql).await.map_err(db_err)?;
    load_chart(txn, temple_id).await
}

pub(crate) async fn load_chart<C: ConnectionTrait>(conn: &C, temple_id: TempleId) -> Result<ChartOfAccounts, ChartError> {
    let groups = account_groups::Entity::find()
        .filter(account_groups::Column::TempleId.eq(temple_id.into_inner()))
        .all(conn)
        .await
        .map_err(db_err)?;
    let ledgers = ledgers::Entity::find()
        .filter(ledgers::Column::TempleId.eq(temple_id.into_inner()))
        .all(conn)
        .await
        .map_err(db_err)?;

    Ok(ChartOfAccounts::from_parts(
        groups.into_iter().map(AccountGroup::from),
        ledgers.into_iter().map(Ledger::from),
    ))
}

async fn find_group<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    group_id: GroupId,
) -> Result<account_groups::Model, ChartError> {
    account_groups::Entity::find_by_id(group_id.into_inner())
        .filter(account_groups::Column::TempleId.eq(temple_id.into_inner()))
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(ChartError::GroupNotFound(group_id))
}

async fn find_ledger<C: ConnectionTrait>(
    conn: &C,
    temple_id: TempleId,
    ledger_id: LedgerId,
) -> Result<ledgers::Model, ChartError> {
    ledgers::Entity::find_by_id(ledger_id.into_inner())
        .filter(ledgers::Column::TempleId.eq(temple_id.into_inner()))
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(ChartError::LedgerNotFound(ledger_id))
}
