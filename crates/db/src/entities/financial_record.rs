//! Financial record entity (read model of the ledger subsystem).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One statement line owed by a student. Rows are written by the ledger;
/// this service only reads balances.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub student_id: String,

    #[sea_orm(nullable)]
    pub description: Option<String>,

    /// Academic term the statement relates to
    #[sea_orm(nullable)]
    pub term: Option<String>,

    /// Outstanding balance on this statement
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub balance: Decimal,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
