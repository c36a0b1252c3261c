//! Database repositories.

mod access_control_log;
mod financial_record;
mod payment_approval;
mod registration;
mod semester_period;

pub use access_control_log::{AccessControlLogRepository, AuditLogFilter};
pub use financial_record::{FinancialRecordRepository, FinancialSummary};
pub use payment_approval::PaymentApprovalRepository;
pub use registration::RegistrationRepository;
pub use semester_period::SemesterPeriodRepository;

use sea_orm::{DbErr, SqlErr};

/// Whether a datastore error is a unique-key violation.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("duplicate key")
}
