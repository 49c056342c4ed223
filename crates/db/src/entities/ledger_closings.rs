//! `SeaORM` Entity for ledger_closings table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_closings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub temple_id: Uuid,
    pub year_id: Uuid,
    pub ledger_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub closing_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub carried_forward: Decimal,
    pub next_year_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
