//! Database entities.

#![allow(missing_docs)]

pub mod access_control_log;
pub mod financial_record;
pub mod payment_approval;
pub mod semester_period;
pub mod student_semester_registration;

pub use access_control_log::Entity as AccessControlLog;
pub use financial_record::Entity as FinancialRecord;
pub use payment_approval::Entity as PaymentApproval;
pub use semester_period::Entity as SemesterPeriod;
pub use student_semester_registration::Entity as StudentSemesterRegistration;
