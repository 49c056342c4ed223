//! `SeaORM` Entity for reconciliation_items table.

use super::sea_orm_active_enums::ReconciliationItemStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliation_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: Uuid,
    pub entry_id: Uuid,
    pub line_id: Uuid,
    pub entry_date: Date,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub debit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub credit: Decimal,
    pub status: ReconciliationItemStatus,
    pub statement_date: Option<Date>,
    pub statement_reference: Option<String>,
    pub note: Option<String>,
    pub is_adjustment: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reconciliation_sessions::Entity",
        from = "Column::SessionId",
        to = "super::reconciliation_sessions::Column::Id",
        on_delete = "Cascade"
    )]
    ReconciliationSessions,
}

impl Related<super::reconciliation_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReconciliationSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
