//! `SeaORM` Entity for reconciliation_sessions table.

use super::sea_orm_active_enums::ReconciliationStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliation_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub temple_id: Uuid,
    pub ledger_id: Uuid,
    pub year_id: Uuid,
    pub period_from: Date,
    pub period_to: Date,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub statement_balance: Decimal,
    pub status: ReconciliationStatus,
    pub created_by: Uuid,
    pub finalized_at: Option<DateTimeWithTimeZone>,
    pub locked_by: Option<Uuid>,
    pub locked_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reconciliation_items::Entity")]
    ReconciliationItems,
}

impl Related<super::reconciliation_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReconciliationItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
