//! Business logic services.

#![allow(missing_docs)]

pub mod access;
pub mod audit;
pub mod clock;
pub mod payment_approval;
pub mod policy;
pub mod registration;
pub mod registration_review;
pub mod retry;
pub mod semester_period;

pub use access::AccessService;
pub use audit::{
    AuditEntry, AuditLogger, AuditQuery, AuditService, AuditSink, AuditSinkService, AuditWriter,
    ChannelAuditSink, DatabaseAuditSink, MemoryAuditSink, RequestMeta, audit_channel,
};
pub use clock::{Clock, ClockService, FixedClock, SystemClock};
pub use payment_approval::{PaymentApprovalService, RecordPaymentInput};
pub use policy::{AccessVerdict, DenialReason, PolicyInputs, decide};
pub use registration::{
    RegisterStudentInput, RegistrationOutcome, RegistrationPolicy, RegistrationResult,
    RegistrationService,
};
pub use registration_review::RegistrationReviewService;
pub use retry::retry_read;
pub use semester_period::{CreateSemesterPeriodInput, SemesterPeriodService};
