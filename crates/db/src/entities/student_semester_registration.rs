//! Student semester registration entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review status of a semester registration.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl RegistrationStatus {
    /// Stored string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

}

/// A student's enrollment claim against one semester period.
///
/// Unique per (`student_id`, `semester_period_id`).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_semester_registration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub student_id: String,

    pub semester_period_id: String,

    pub registration_date: DateTimeWithTimeZone,

    /// Staff member who submitted the registration
    pub registered_by: String,

    #[sea_orm(nullable)]
    pub approved_by: Option<String>,

    #[sea_orm(nullable)]
    pub approval_date: Option<DateTimeWithTimeZone>,

    pub status: RegistrationStatus,

    /// Payment approval that satisfied the registration precondition
    #[sea_orm(nullable)]
    pub payment_approval_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::semester_period::Entity",
        from = "Column::SemesterPeriodId",
        to = "super::semester_period::Column::Id",
        on_delete = "Restrict"
    )]
    SemesterPeriod,
    #[sea_orm(
        belongs_to = "super::payment_approval::Entity",
        from = "Column::PaymentApprovalId",
        to = "super::payment_approval::Column::Id",
        on_delete = "SetNull"
    )]
    PaymentApproval,
}

impl Related<super::semester_period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SemesterPeriod.def()
    }
}

impl Related<super::payment_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentApproval.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
