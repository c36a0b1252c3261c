//! Accounts-office review of pending registrations.

use campus_common::AppResult;
use campus_db::{
    entities::{
        access_control_log::{AuditAction, ReasonCode},
        student_semester_registration,
        student_semester_registration::RegistrationStatus,
    },
    repositories::RegistrationRepository,
};
use chrono::Utc;
use sea_orm::Set;
use serde_json::json;
use tracing::info;

use super::audit::{AuditEntry, AuditLogger, RequestMeta};

/// Service for reviewing registrations.
#[derive(Clone)]
pub struct RegistrationReviewService {
    repo: RegistrationRepository,
    audit: AuditLogger,
}

impl RegistrationReviewService {
    /// Create a new registration review service.
    #[must_use]
    pub const fn new(repo: RegistrationRepository, audit: AuditLogger) -> Self {
        Self { repo, audit }
    }

    /// Approve a pending registration.
    pub async fn approve(
        &self,
        reviewer_id: &str,
        id: &str,
        notes: Option<&str>,
        meta: &RequestMeta,
    ) -> AppResult<student_semester_registration::Model> {
        self.transition(
            reviewer_id,
            id,
            &[RegistrationStatus::Pending],
            RegistrationStatus::Approved,
            notes,
            meta,
        )
        .await
    }

    /// Reject a pending registration.
    pub async fn reject(
        &self,
        reviewer_id: &str,
        id: &str,
        notes: Option<&str>,
        meta: &RequestMeta,
    ) -> AppResult<student_semester_registration::Model> {
        self.transition(
            reviewer_id,
            id,
            &[RegistrationStatus::Pending],
            RegistrationStatus::Rejected,
            notes,
            meta,
        )
        .await
    }

    /// Cancel a pending or approved registration.
    pub async fn cancel(
        &self,
        actor_id: &str,
        id: &str,
        notes: Option<&str>,
        meta: &RequestMeta,
    ) -> AppResult<student_semester_registration::Model> {
        self.transition(
            actor_id,
            id,
            &[RegistrationStatus::Pending, RegistrationStatus::Approved],
            RegistrationStatus::Cancelled,
            notes,
            meta,
        )
        .await
    }

    /// Get a registration by ID.
    pub async fn get(&self, id: &str) -> AppResult<student_semester_registration::Model> {
        self.repo.get_by_id(id).await
    }

    /// Registrations of a student, newest first.
    pub async fn list_for_student(
        &self,
        student_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<student_semester_registration::Model>> {
        self.repo.find_by_student(student_id, limit, offset).await
    }

    /// Registrations for a period, oldest first, optionally by status.
    pub async fn list_for_period(
        &self,
        semester_period_id: &str,
        status: Option<RegistrationStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<student_semester_registration::Model>> {
        self.repo
            .find_by_period(semester_period_id, status, limit, offset)
            .await
    }

    async fn transition(
        &self,
        actor_id: &str,
        id: &str,
        expected: &[RegistrationStatus],
        target: RegistrationStatus,
        notes: Option<&str>,
        meta: &RequestMeta,
    ) -> AppResult<student_semester_registration::Model> {
        let now = Utc::now();
        let mut changes = student_semester_registration::ActiveModel {
            status: Set(target),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };
        // Status, reviewer and review time move together.
        if matches!(
            target,
            RegistrationStatus::Approved | RegistrationStatus::Rejected
        ) {
            changes.approved_by = Set(Some(actor_id.to_string()));
            changes.approval_date = Set(Some(now.into()));
        }
        if let Some(notes) = notes {
            changes.notes = Set(Some(notes.to_string()));
        }

        let registration = self.repo.update_if_status(id, expected, changes).await?;

        let action = match target {
            RegistrationStatus::Approved => AuditAction::RegistrationApproved,
            RegistrationStatus::Rejected => AuditAction::RegistrationRejected,
            _ => AuditAction::RegistrationCancelled,
        };

        info!(
            registration_id = %id,
            actor = %actor_id,
            status = target.as_str(),
            "Registration reviewed"
        );

        self.audit
            .record(
                AuditEntry::new(
                    registration.student_id.as_str(),
                    action,
                    ReasonCode::StatusChange,
                )
                .actor(Some(actor_id))
                .registration(Some(&registration.id))
                .payment_approval(registration.payment_approval_id.as_deref())
                .notes(notes)
                .meta(meta)
                .details(json!({
                    "semesterPeriodId": registration.semester_period_id,
                    "status": registration.status,
                })),
            )
            .await;

        Ok(registration)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::audit::MemoryAuditSink;
    use campus_common::AppError;
    use campus_db::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: MockDatabase) -> (RegistrationReviewService, MemoryAuditSink) {
        let sink = MemoryAuditSink::new();
        let service = RegistrationReviewService::new(
            RegistrationRepository::new(Arc::new(db.into_connection())),
            AuditLogger::new(Arc::new(sink.clone())),
        );
        (service, sink)
    }

    fn updated(status: RegistrationStatus, rows: u64) -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: rows,
            }])
            .append_query_results([[fixtures::registration(
                "reg1", "student1", "sp1", status,
            )]])
    }

    #[tokio::test]
    async fn test_approve_pending_registration() {
        let (service, sink) = service(updated(RegistrationStatus::Approved, 1));

        let registration = service
            .approve("accountant1", "reg1", Some("fees verified"), &RequestMeta::default())
            .await
            .unwrap();

        assert_eq!(registration.status, RegistrationStatus::Approved);
        let entries = sink.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::RegistrationApproved);
        assert_eq!(entries[0].registration_id.as_deref(), Some("reg1"));
    }

    #[tokio::test]
    async fn test_reject_non_pending_conflicts() {
        let (service, sink) = service(updated(RegistrationStatus::Approved, 0));

        let result = service
            .reject("accountant1", "reg1", None, &RequestMeta::default())
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(sink.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_approved_registration() {
        let (service, sink) = service(updated(RegistrationStatus::Cancelled, 1));

        let registration = service
            .cancel("admin1", "reg1", None, &RequestMeta::default())
            .await
            .unwrap();

        assert_eq!(registration.status, RegistrationStatus::Cancelled);
        assert_eq!(
            sink.entries().await[0].action,
            AuditAction::RegistrationCancelled
        );
    }

    #[tokio::test]
    async fn test_get_missing_registration() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<student_semester_registration::Model>::new()]);
        let (service, _sink) = service(db);

        assert!(matches!(
            service.get("missing").await,
            Err(AppError::NotFound(_))
        ));
    }
}
