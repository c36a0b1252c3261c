//! Access decision service.

use campus_common::{AppError, AppResult, get_metrics};
use campus_db::{
    entities::access_control_log::{AuditAction, ReasonCode},
    repositories::{
        FinancialRecordRepository, PaymentApprovalRepository, RegistrationRepository,
        SemesterPeriodRepository,
    },
};
use chrono::NaiveDate;
use serde_json::json;
use tracing::{info, warn};

use super::audit::{AuditEntry, AuditLogger, RequestMeta};
use super::clock::ClockService;
use super::policy::{self, AccessVerdict, PolicyInputs};
use super::retry::retry_read;

/// Evaluates whether a student may use institutional services.
///
/// Read-only: the only write is the audit entry for each call.
#[derive(Clone)]
pub struct AccessService {
    approval_repo: PaymentApprovalRepository,
    registration_repo: RegistrationRepository,
    period_repo: SemesterPeriodRepository,
    financial_repo: FinancialRecordRepository,
    audit: AuditLogger,
    clock: ClockService,
}

impl AccessService {
    /// Create a new access service.
    #[must_use]
    pub const fn new(
        approval_repo: PaymentApprovalRepository,
        registration_repo: RegistrationRepository,
        period_repo: SemesterPeriodRepository,
        financial_repo: FinancialRecordRepository,
        audit: AuditLogger,
        clock: ClockService,
    ) -> Self {
        Self {
            approval_repo,
            registration_repo,
            period_repo,
            financial_repo,
            audit,
            clock,
        }
    }

    /// Evaluate access for today.
    pub async fn evaluate(
        &self,
        student_id: &str,
        actor_id: Option<&str>,
        meta: &RequestMeta,
    ) -> AppResult<AccessVerdict> {
        self.evaluate_on(student_id, self.clock.today(), actor_id, meta)
            .await
    }

    /// Evaluate access as of `today`.
    pub async fn evaluate_on(
        &self,
        student_id: &str,
        today: NaiveDate,
        actor_id: Option<&str>,
        meta: &RequestMeta,
    ) -> AppResult<AccessVerdict> {
        let entry = |reason| {
            AuditEntry::new(student_id, AuditAction::Evaluate, reason)
                .actor(actor_id)
                .meta(meta)
        };

        if student_id.trim().is_empty() {
            self.audit
                .record(entry(ReasonCode::InvalidInput).notes(Some("empty student id")))
                .await;
            return Err(AppError::Validation("student id is required".to_string()));
        }

        let inputs = match self.load_inputs(student_id, today).await {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(student_id = %student_id, error = %e, "Access evaluation failed");
                if e.is_database() {
                    get_metrics().record_db_error();
                }
                self.audit
                    .record(entry(ReasonCode::DatastoreError).notes(Some(&e.to_string())))
                    .await;
                return Err(e);
            }
        };

        let verdict = policy::decide(&inputs, today);
        get_metrics().record_evaluation(verdict.has_access);

        info!(
            student_id = %student_id,
            has_access = verdict.has_access,
            payment_approved = verdict.payment_approved,
            semester_registered = verdict.semester_registered,
            reason = verdict.reason_code().as_str(),
            "Access evaluated"
        );

        self.audit
            .record(
                entry(verdict.reason_code())
                    .payment_approval(verdict.payment_approval_id.as_deref())
                    .details(json!({ "verdict": verdict })),
            )
            .await;

        Ok(verdict)
    }

    /// Load the rows the policy needs. Each read is retried once.
    async fn load_inputs(&self, student_id: &str, today: NaiveDate) -> AppResult<PolicyInputs> {
        let financial = retry_read("financial_records", || {
            self.financial_repo.summarize(student_id)
        })
        .await?;

        let approvals = retry_read("payment_approvals", || {
            self.approval_repo.find_effective(student_id, today)
        })
        .await?;

        let registrations = retry_read("registrations", || {
            self.registration_repo.find_approved_by_student(student_id)
        })
        .await?;

        let period_ids: Vec<String> = registrations
            .iter()
            .map(|r| r.semester_period_id.clone())
            .collect();
        let periods = retry_read("semester_periods", || {
            self.period_repo.find_active_by_ids(period_ids.clone())
        })
        .await?;

        Ok(PolicyInputs {
            financial,
            approvals,
            registrations,
            periods,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::audit::MemoryAuditSink;
    use crate::services::clock::FixedClock;
    use campus_db::entities::{
        financial_record, payment_approval, payment_approval::PaymentApprovalStatus,
        semester_period, student_semester_registration,
        student_semester_registration::RegistrationStatus,
    };
    use campus_db::test_utils::fixtures::{self, date};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use std::sync::Arc;

    struct Rows {
        financial: Vec<financial_record::Model>,
        approvals: Vec<payment_approval::Model>,
        registrations: Vec<student_semester_registration::Model>,
        periods: Vec<semester_period::Model>,
    }

    fn service(rows: Rows, today: NaiveDate) -> (AccessService, MemoryAuditSink) {
        let financial_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows.financial])
            .into_connection();
        let approval_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows.approvals])
            .into_connection();
        let registration_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows.registrations])
            .into_connection();
        let period_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows.periods])
            .into_connection();

        let sink = MemoryAuditSink::new();
        let service = AccessService::new(
            PaymentApprovalRepository::new(Arc::new(approval_db)),
            RegistrationRepository::new(Arc::new(registration_db)),
            SemesterPeriodRepository::new(Arc::new(period_db)),
            FinancialRecordRepository::new(Arc::new(financial_db)),
            AuditLogger::new(Arc::new(sink.clone())),
            Arc::new(FixedClock(today)),
        );
        (service, sink)
    }

    fn empty() -> Rows {
        Rows {
            financial: vec![],
            approvals: vec![],
            registrations: vec![],
            periods: vec![],
        }
    }

    fn spring_approval() -> payment_approval::Model {
        fixtures::payment_approval(
            "pa1",
            "student1",
            PaymentApprovalStatus::Approved,
            date(2024, 1, 1),
            date(2024, 6, 30),
        )
    }

    #[tokio::test]
    async fn test_student_without_rows_is_denied() {
        let (service, sink) = service(empty(), date(2024, 3, 15));

        let verdict = service
            .evaluate("student1", None, &RequestMeta::default())
            .await
            .unwrap();

        assert!(!verdict.has_access);
        assert!(verdict.denial_reason.starts_with("payment not approved"));

        let entries = sink.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Evaluate);
        assert_eq!(entries[0].reason, ReasonCode::PaymentNotApproved);
    }

    #[tokio::test]
    async fn test_valid_approval_grants_access() {
        let rows = Rows {
            approvals: vec![spring_approval()],
            ..empty()
        };
        let (service, sink) = service(rows, date(2024, 3, 15));

        let verdict = service
            .evaluate("student1", Some("student1"), &RequestMeta::default())
            .await
            .unwrap();

        assert!(verdict.has_access);
        assert!(verdict.payment_approved);
        assert_eq!(verdict.access_valid_until, Some(date(2024, 6, 30)));

        let entries = sink.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, ReasonCode::Granted);
        assert_eq!(entries[0].payment_approval_id.as_deref(), Some("pa1"));
        assert_eq!(entries[0].actor_id.as_deref(), Some("student1"));
    }

    #[tokio::test]
    async fn test_expired_window_denied_even_if_store_returns_row() {
        // The store filter is re-checked in the policy.
        let rows = Rows {
            approvals: vec![spring_approval()],
            ..empty()
        };
        let (service, _sink) = service(rows, date(2024, 7, 1));

        let verdict = service
            .evaluate("student1", None, &RequestMeta::default())
            .await
            .unwrap();

        assert!(!verdict.has_access);
        assert!(!verdict.payment_approved);
    }

    #[tokio::test]
    async fn test_registration_reported_alongside_payment() {
        let rows = Rows {
            approvals: vec![spring_approval()],
            registrations: vec![fixtures::registration(
                "reg1",
                "student1",
                "sp1",
                RegistrationStatus::Approved,
            )],
            periods: vec![fixtures::semester_period(
                "sp1",
                date(2024, 1, 8),
                date(2024, 5, 31),
            )],
            ..empty()
        };
        let (service, _sink) = service(rows, date(2024, 3, 15));

        let verdict = service
            .evaluate("student1", None, &RequestMeta::default())
            .await
            .unwrap();

        assert!(verdict.semester_registered);
        assert_eq!(verdict.semester_end_date, Some(date(2024, 5, 31)));
        assert_eq!(verdict.semester_period_id.as_deref(), Some("sp1"));
    }

    #[tokio::test]
    async fn test_read_is_retried_once() {
        let financial_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .append_query_results([vec![fixtures::financial_record("fr1", "student1", 0)]])
            .into_connection();
        let sink = MemoryAuditSink::new();
        let service = AccessService::new(
            PaymentApprovalRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<payment_approval::Model>::new()])
                    .into_connection(),
            )),
            RegistrationRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<student_semester_registration::Model>::new()])
                    .into_connection(),
            )),
            SemesterPeriodRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            FinancialRecordRepository::new(Arc::new(financial_db)),
            AuditLogger::new(Arc::new(sink.clone())),
            Arc::new(FixedClock(date(2024, 3, 15))),
        );

        let verdict = service
            .evaluate("student1", None, &RequestMeta::default())
            .await
            .unwrap();

        assert!(verdict.has_financial_statements);
        assert_eq!(
            verdict.denial,
            Some(policy::DenialReason::ZeroBalanceNoApproval)
        );
    }

    #[tokio::test]
    async fn test_persistent_datastore_failure_is_audited() {
        let financial_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([
                DbErr::Custom("down".to_string()),
                DbErr::Custom("still down".to_string()),
            ])
            .into_connection();
        let sink = MemoryAuditSink::new();
        let blank = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = AccessService::new(
            PaymentApprovalRepository::new(blank()),
            RegistrationRepository::new(blank()),
            SemesterPeriodRepository::new(blank()),
            FinancialRecordRepository::new(Arc::new(financial_db)),
            AuditLogger::new(Arc::new(sink.clone())),
            Arc::new(FixedClock(date(2024, 3, 15))),
        );

        let result = service
            .evaluate("student1", None, &RequestMeta::default())
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        let entries = sink.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, ReasonCode::DatastoreError);
    }

    #[tokio::test]
    async fn test_empty_student_id_rejected_and_audited() {
        let (service, sink) = service(empty(), date(2024, 3, 15));

        let result = service.evaluate("  ", None, &RequestMeta::default()).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(sink.entries().await[0].reason, ReasonCode::InvalidInput);
    }
}
