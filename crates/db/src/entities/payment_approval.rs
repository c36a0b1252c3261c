//! Payment approval entity.
//!
//! An approval asserts that a student's payment was reviewed and accepted,
//! and bounds the dates during which it makes the student eligible for access.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored status of a payment approval.
///
/// `Expired` is normally derived at read time from the validity window
/// (see [`Model::effective_status`]); it is stored only when an operator
/// expires an approval explicitly.
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
pub enum PaymentApprovalStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "revoked")]
    Revoked,
}

impl PaymentApprovalStatus {
    /// Stored string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_approval")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Student the payment belongs to
    pub student_id: String,

    /// Ledger payment this approval was raised for, if any
    #[sea_orm(nullable)]
    pub payment_id: Option<String>,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount_paid: Decimal,

    #[sea_orm(nullable)]
    pub payment_reference: Option<String>,

    pub payment_date: Date,

    /// Accounts-office reviewer who approved or rejected the payment
    #[sea_orm(nullable)]
    pub approved_by: Option<String>,

    #[sea_orm(nullable)]
    pub approval_date: Option<DateTimeWithTimeZone>,

    /// First day of the access window (inclusive)
    pub access_valid_from: Date,

    /// Last day of the access window (inclusive)
    pub access_valid_until: Date,

    pub status: PaymentApprovalStatus,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub auto_expire: bool,

    #[sea_orm(nullable)]
    pub revoked_by: Option<String>,

    #[sea_orm(nullable)]
    pub revoked_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub revocation_reason: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether `day` falls inside the inclusive access window.
    #[must_use]
    pub fn window_contains(&self, day: Date) -> bool {
        self.access_valid_from <= day && day <= self.access_valid_until
    }

    /// Whether this approval currently makes the student eligible.
    ///
    /// Only `approved` rows count; revocation wins over any date window.
    #[must_use]
    pub fn is_effective_on(&self, day: Date) -> bool {
        self.status == PaymentApprovalStatus::Approved && self.window_contains(day)
    }

    /// Status as observed on `day`: an approved row past its window reads as expired.
    #[must_use]
    pub fn effective_status(&self, day: Date) -> PaymentApprovalStatus {
        if self.status == PaymentApprovalStatus::Approved && day > self.access_valid_until {
            PaymentApprovalStatus::Expired
        } else {
            self.status
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn day(y: i32, m: u32, d: u32) -> Date {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    fn approval(status: PaymentApprovalStatus) -> Model {
        Model {
            id: "pa1".to_string(),
            student_id: "s1".to_string(),
            payment_id: None,
            amount_paid: Decimal::new(50_000, 2),
            payment_reference: None,
            payment_date: day(2024, 1, 1),
            approved_by: None,
            approval_date: None,
            access_valid_from: day(2024, 1, 1),
            access_valid_until: day(2024, 6, 30),
            status,
            notes: None,
            auto_expire: true,
            revoked_by: None,
            revoked_at: None,
            revocation_reason: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let a = approval(PaymentApprovalStatus::Approved);
        assert!(a.is_effective_on(day(2024, 1, 1)));
        assert!(a.is_effective_on(day(2024, 6, 30)));
        assert!(!a.is_effective_on(day(2023, 12, 31)));
        assert!(!a.is_effective_on(day(2024, 7, 1)));
    }

    #[test]
    fn test_only_approved_is_effective() {
        for status in [
            PaymentApprovalStatus::Pending,
            PaymentApprovalStatus::Rejected,
            PaymentApprovalStatus::Expired,
            PaymentApprovalStatus::Revoked,
        ] {
            assert!(!approval(status).is_effective_on(day(2024, 3, 15)));
        }
    }

    #[test]
    fn test_effective_status_derives_expiry() {
        let a = approval(PaymentApprovalStatus::Approved);
        assert_eq!(a.effective_status(day(2024, 3, 15)), PaymentApprovalStatus::Approved);
        assert_eq!(a.effective_status(day(2024, 7, 1)), PaymentApprovalStatus::Expired);

        let r = approval(PaymentApprovalStatus::Revoked);
        assert_eq!(r.effective_status(day(2024, 7, 1)), PaymentApprovalStatus::Revoked);
    }

    #[test]
    fn test_status_string_mapping() {
        for status in [
            PaymentApprovalStatus::Pending,
            PaymentApprovalStatus::Approved,
            PaymentApprovalStatus::Rejected,
            PaymentApprovalStatus::Expired,
            PaymentApprovalStatus::Revoked,
        ] {
            assert_eq!(status.to_value(), status.as_str());
        }
    }
}
