//! Semester period entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An administratively defined academic term.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "semester_period")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display name, e.g. "First Semester 2024/2025"
    pub name: String,

    /// Academic year label, e.g. "2024/2025"
    pub academic_year: String,

    /// Semester number within the year (1 or 2)
    pub semester: i16,

    pub start_date: Date,

    pub end_date: Date,

    pub registration_start_date: Date,

    pub registration_end_date: Date,

    pub is_active: bool,

    pub is_registration_open: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether `day` falls inside the teaching period (inclusive).
    #[must_use]
    pub fn contains(&self, day: Date) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    /// Whether the period is active and `day` falls inside it.
    #[must_use]
    pub fn is_current_on(&self, day: Date) -> bool {
        self.is_active && self.contains(day)
    }

    /// Whether registrations are being accepted on `day`.
    #[must_use]
    pub fn registration_window_open(&self, day: Date) -> bool {
        self.is_registration_open
            && self.registration_start_date <= day
            && day <= self.registration_end_date
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::student_semester_registration::Entity")]
    Registrations,
}

impl Related<super::student_semester_registration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Registrations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
