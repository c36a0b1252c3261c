//! Payment approval lifecycle: recording payments and reviewer transitions.

use campus_common::{AppError, AppResult, IdGenerator};
use campus_db::{
    entities::{
        access_control_log::{AuditAction, ReasonCode},
        payment_approval,
        payment_approval::PaymentApprovalStatus,
    },
    repositories::PaymentApprovalRepository,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::Set;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use super::audit::{AuditEntry, AuditLogger, RequestMeta};
use super::clock::ClockService;

const fn default_true() -> bool {
    true
}

/// Input for recording a payment awaiting review.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentInput {
    #[validate(length(min = 1, max = 64))]
    pub student_id: String,
    #[validate(length(min = 1, max = 64))]
    pub payment_id: Option<String>,
    pub amount_paid: Decimal,
    #[validate(length(max = 128))]
    pub payment_reference: Option<String>,
    pub payment_date: NaiveDate,
    pub access_valid_from: NaiveDate,
    pub access_valid_until: NaiveDate,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub auto_expire: bool,
}

/// Service for the payment approval lifecycle.
///
/// Status transitions are conditional updates, so two reviewers acting on the
/// same row cannot both succeed.
#[derive(Clone)]
pub struct PaymentApprovalService {
    repo: PaymentApprovalRepository,
    audit: AuditLogger,
    clock: ClockService,
    id_gen: IdGenerator,
}

impl PaymentApprovalService {
    /// Create a new payment approval service.
    #[must_use]
    pub const fn new(repo: PaymentApprovalRepository, audit: AuditLogger, clock: ClockService) -> Self {
        Self {
            repo,
            audit,
            clock,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record a payment as a pending approval.
    pub async fn record_payment(
        &self,
        actor_id: &str,
        input: RecordPaymentInput,
        meta: &RequestMeta,
    ) -> AppResult<payment_approval::Model> {
        input.validate()?;

        if input.amount_paid <= Decimal::ZERO {
            return Err(AppError::Validation(
                "amount paid must be positive".to_string(),
            ));
        }
        if input.access_valid_until <= input.access_valid_from {
            return Err(AppError::Validation(
                "access valid until must be after access valid from".to_string(),
            ));
        }

        let model = payment_approval::ActiveModel {
            id: Set(self.id_gen.generate()),
            student_id: Set(input.student_id),
            payment_id: Set(input.payment_id),
            amount_paid: Set(input.amount_paid),
            payment_reference: Set(input.payment_reference),
            payment_date: Set(input.payment_date),
            approved_by: Set(None),
            approval_date: Set(None),
            access_valid_from: Set(input.access_valid_from),
            access_valid_until: Set(input.access_valid_until),
            status: Set(PaymentApprovalStatus::Pending),
            notes: Set(input.notes),
            auto_expire: Set(input.auto_expire),
            revoked_by: Set(None),
            revoked_at: Set(None),
            revocation_reason: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let approval = self.repo.create(model).await?;

        info!(
            approval_id = %approval.id,
            student_id = %approval.student_id,
            amount_paid = %approval.amount_paid,
            "Payment recorded"
        );
        self.audit_transition(AuditAction::PaymentRecorded, actor_id, &approval, None, meta)
            .await;

        Ok(approval)
    }

    /// Approve a pending payment.
    pub async fn approve(
        &self,
        actor_id: &str,
        id: &str,
        notes: Option<&str>,
        meta: &RequestMeta,
    ) -> AppResult<payment_approval::Model> {
        let now = Utc::now();
        let mut changes = payment_approval::ActiveModel {
            status: Set(PaymentApprovalStatus::Approved),
            approved_by: Set(Some(actor_id.to_string())),
            approval_date: Set(Some(now.into())),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };
        if let Some(notes) = notes {
            changes.notes = Set(Some(notes.to_string()));
        }

        let approval = self
            .repo
            .update_if_status(id, &[PaymentApprovalStatus::Pending], changes)
            .await?;

        info!(approval_id = %id, reviewer = %actor_id, "Payment approved");
        self.audit_transition(AuditAction::PaymentApproved, actor_id, &approval, notes, meta)
            .await;

        Ok(approval)
    }

    /// Reject a pending payment.
    pub async fn reject(
        &self,
        actor_id: &str,
        id: &str,
        notes: Option<&str>,
        meta: &RequestMeta,
    ) -> AppResult<payment_approval::Model> {
        let now = Utc::now();
        let mut changes = payment_approval::ActiveModel {
            status: Set(PaymentApprovalStatus::Rejected),
            approved_by: Set(Some(actor_id.to_string())),
            approval_date: Set(Some(now.into())),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };
        if let Some(notes) = notes {
            changes.notes = Set(Some(notes.to_string()));
        }

        let approval = self
            .repo
            .update_if_status(id, &[PaymentApprovalStatus::Pending], changes)
            .await?;

        info!(approval_id = %id, reviewer = %actor_id, "Payment rejected");
        self.audit_transition(AuditAction::PaymentRejected, actor_id, &approval, notes, meta)
            .await;

        Ok(approval)
    }

    /// Revoke an approval in any state except revoked. Takes effect immediately.
    pub async fn revoke(
        &self,
        actor_id: &str,
        id: &str,
        reason: &str,
        meta: &RequestMeta,
    ) -> AppResult<payment_approval::Model> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation(
                "revocation reason is required".to_string(),
            ));
        }

        let now = Utc::now();
        let changes = payment_approval::ActiveModel {
            status: Set(PaymentApprovalStatus::Revoked),
            revoked_by: Set(Some(actor_id.to_string())),
            revoked_at: Set(Some(now.into())),
            revocation_reason: Set(Some(reason.to_string())),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };

        let approval = self
            .repo
            .update_if_status(
                id,
                &[
                    PaymentApprovalStatus::Pending,
                    PaymentApprovalStatus::Approved,
                    PaymentApprovalStatus::Rejected,
                    PaymentApprovalStatus::Expired,
                ],
                changes,
            )
            .await?;

        info!(approval_id = %id, actor = %actor_id, "Payment approval revoked");
        self.audit_transition(
            AuditAction::PaymentRevoked,
            actor_id,
            &approval,
            Some(reason),
            meta,
        )
        .await;

        Ok(approval)
    }

    /// Get an approval by ID.
    pub async fn get(&self, id: &str) -> AppResult<payment_approval::Model> {
        self.repo.get_by_id(id).await
    }

    /// Approvals for a student, newest first.
    pub async fn list_for_student(
        &self,
        student_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<payment_approval::Model>> {
        self.repo.find_by_student(student_id, limit, offset).await
    }

    /// Status as observed today; approved rows past their window read as expired.
    #[must_use]
    pub fn effective_status(&self, approval: &payment_approval::Model) -> PaymentApprovalStatus {
        approval.effective_status(self.clock.today())
    }

    async fn audit_transition(
        &self,
        action: AuditAction,
        actor_id: &str,
        approval: &payment_approval::Model,
        notes: Option<&str>,
        meta: &RequestMeta,
    ) {
        self.audit
            .record(
                AuditEntry::new(approval.student_id.as_str(), action, ReasonCode::StatusChange)
                    .actor(Some(actor_id))
                    .payment_approval(Some(&approval.id))
                    .notes(notes)
                    .meta(meta)
                    .details(json!({
                        "status": approval.status,
                        "accessValidFrom": approval.access_valid_from,
                        "accessValidUntil": approval.access_valid_until,
                    })),
            )
            .await;
    }
}
