//! `SeaORM` Entity for entries table.

use super::sea_orm_active_enums::{EntryKind, EntryStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub temple_id: Uuid,
    pub year_id: Uuid,
    pub kind: EntryKind,
    pub entry_date: Date,
    pub status: EntryStatus,
    pub narration: Option<String>,
    pub original_reference: Option<String>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub decision_note: Option<String>,
    pub decided_at: Option<DateTimeWithTimeZone>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub cancel_reason: Option<String>,
    pub replaces: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounting_years::Entity",
        from = "Column::YearId",
        to = "super::accounting_years::Column::Id"
    )]
    AccountingYears,
    #[sea_orm(has_many = "super::entry_lines::Entity")]
    EntryLines,
}

impl Related<super::accounting_years::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountingYears.def()
    }
}

impl Related<super::entry_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EntryLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
