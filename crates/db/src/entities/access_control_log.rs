//! Access control log entity (append-only audit trail).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What was attempted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    #[sea_orm(string_value = "evaluate")]
    Evaluate,
    #[sea_orm(string_value = "register_succeeded")]
    RegisterSucceeded,
    #[sea_orm(string_value = "register_denied")]
    RegisterDenied,
    #[sea_orm(string_value = "register_conflict")]
    RegisterConflict,
    #[sea_orm(string_value = "register_failed")]
    RegisterFailed,
    #[sea_orm(string_value = "payment_recorded")]
    PaymentRecorded,
    #[sea_orm(string_value = "payment_approved")]
    PaymentApproved,
    #[sea_orm(string_value = "payment_rejected")]
    PaymentRejected,
    #[sea_orm(string_value = "payment_revoked")]
    PaymentRevoked,
    #[sea_orm(string_value = "registration_approved")]
    RegistrationApproved,
    #[sea_orm(string_value = "registration_rejected")]
    RegistrationRejected,
    #[sea_orm(string_value = "registration_cancelled")]
    RegistrationCancelled,
}

impl AuditAction {
    /// Stored string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Evaluate => "evaluate",
            Self::RegisterSucceeded => "register_succeeded",
            Self::RegisterDenied => "register_denied",
            Self::RegisterConflict => "register_conflict",
            Self::RegisterFailed => "register_failed",
            Self::PaymentRecorded => "payment_recorded",
            Self::PaymentApproved => "payment_approved",
            Self::PaymentRejected => "payment_rejected",
            Self::PaymentRevoked => "payment_revoked",
            Self::RegistrationApproved => "registration_approved",
            Self::RegistrationRejected => "registration_rejected",
            Self::RegistrationCancelled => "registration_cancelled",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the attempt ended the way it did.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    #[sea_orm(string_value = "granted")]
    Granted,
    #[sea_orm(string_value = "zero_balance_no_approval")]
    ZeroBalanceNoApproval,
    #[sea_orm(string_value = "payment_not_approved")]
    PaymentNotApproved,
    #[sea_orm(string_value = "registration_window_closed")]
    RegistrationWindowClosed,
    #[sea_orm(string_value = "already_registered")]
    AlreadyRegistered,
    #[sea_orm(string_value = "invalid_input")]
    InvalidInput,
    #[sea_orm(string_value = "datastore_error")]
    DatastoreError,
    #[sea_orm(string_value = "timeout")]
    Timeout,
    #[sea_orm(string_value = "status_change")]
    StatusChange,
}

impl ReasonCode {
    /// Stored string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::ZeroBalanceNoApproval => "zero_balance_no_approval",
            Self::PaymentNotApproved => "payment_not_approved",
            Self::RegistrationWindowClosed => "registration_window_closed",
            Self::AlreadyRegistered => "already_registered",
            Self::InvalidInput => "invalid_input",
            Self::DatastoreError => "datastore_error",
            Self::Timeout => "timeout",
            Self::StatusChange => "status_change",
        }
    }
}

/// One audit entry. Never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "access_control_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub student_id: String,

    pub action: AuditAction,

    pub reason: ReasonCode,

    #[sea_orm(nullable)]
    pub payment_approval_id: Option<String>,

    #[sea_orm(nullable)]
    pub registration_id: Option<String>,

    /// Who triggered the action (None for anonymous gateway checks)
    #[sea_orm(nullable)]
    pub actor_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    /// Snapshot of the decision inputs and outcome
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub details: Option<Json>,

    #[sea_orm(nullable)]
    pub ip_address: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
