//! Payment-gated semester registration.

use campus_common::{AppError, AppResult, IdGenerator, config::PolicyConfig, get_metrics};
use campus_db::{
    entities::{
        access_control_log::{AuditAction, ReasonCode},
        student_semester_registration,
        student_semester_registration::RegistrationStatus,
    },
    repositories::{
        FinancialRecordRepository, FinancialSummary, PaymentApprovalRepository,
        RegistrationRepository, SemesterPeriodRepository,
    },
};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use validator::Validate;

use super::audit::{AuditEntry, AuditLogger, RequestMeta};
use super::clock::ClockService;
use super::policy::{self, AccessVerdict, DenialReason, PolicyInputs};

/// Input for registering a student for a semester period.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentInput {
    #[validate(length(min = 1, max = 64))]
    pub student_id: String,
    #[validate(length(min = 1, max = 64))]
    pub semester_period_id: String,
    #[validate(length(min = 1, max = 64))]
    pub registered_by: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// How a registration attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A pending registration was created.
    Registered,
    /// The student is not eligible.
    PolicyDenied(DenialReason),
    /// A registration for the pair already exists.
    AlreadyRegistered,
}

impl RegistrationOutcome {
    /// Stable code for API responses.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::PolicyDenied(_) => "policy_denied",
            Self::AlreadyRegistered => "already_registered",
        }
    }
}

/// Result of [`RegistrationService::register_student`].
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    pub outcome: RegistrationOutcome,
    /// The created row, only for `Registered`.
    pub registration: Option<student_semester_registration::Model>,
    pub message: String,
    /// Payment sub-check the decision was based on.
    pub verdict: AccessVerdict,
}

impl RegistrationResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcome == RegistrationOutcome::Registered
    }

    #[must_use]
    pub fn registration_id(&self) -> Option<&str> {
        self.registration.as_ref().map(|r| r.id.as_str())
    }

    fn denied(reason: DenialReason, verdict: AccessVerdict) -> Self {
        Self {
            outcome: RegistrationOutcome::PolicyDenied(reason),
            registration: None,
            message: reason.message().to_string(),
            verdict,
        }
    }

    fn already_registered(verdict: AccessVerdict) -> Self {
        Self {
            outcome: RegistrationOutcome::AlreadyRegistered,
            registration: None,
            message: "already registered for this period".to_string(),
            verdict,
        }
    }
}

/// Registration rules taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationPolicy {
    /// Default deadline for one registration attempt.
    pub timeout: Duration,
    /// Refuse registrations outside the period's registration window.
    pub require_open_window: bool,
}

impl RegistrationPolicy {
    #[must_use]
    pub const fn from_config(config: &PolicyConfig) -> Self {
        Self {
            timeout: config.registration_timeout(),
            require_open_window: config.require_open_registration_window,
        }
    }
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
    }
}

/// Run `fut` under `deadline`, mapping expiry to [`AppError::Timeout`].
///
/// Whatever `fut` owns (an open transaction included) is dropped on expiry.
pub async fn with_deadline<T>(
    deadline: Duration,
    fut: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::time::timeout(deadline, fut).await.unwrap_or_else(|_| {
        Err(AppError::Timeout(format!(
            "registration exceeded {}ms",
            deadline.as_millis()
        )))
    })
}

/// Creates registrations, but only for students holding a valid payment approval.
#[derive(Clone)]
pub struct RegistrationService {
    db: Arc<DatabaseConnection>,
    audit: AuditLogger,
    clock: ClockService,
    policy: RegistrationPolicy,
    id_gen: IdGenerator,
}

impl RegistrationService {
    /// Create a new registration service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        audit: AuditLogger,
        clock: ClockService,
        policy: RegistrationPolicy,
    ) -> Self {
        Self {
            db,
            audit,
            clock,
            policy,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a student for a semester period.
    ///
    /// The eligibility re-check and the insert share one transaction. Policy
    /// denials and duplicates are returned as outcomes, not errors. Exactly
    /// one audit entry is written per call.
    pub async fn register_student(
        &self,
        input: RegisterStudentInput,
        meta: &RequestMeta,
        deadline: Option<Duration>,
    ) -> AppResult<RegistrationResult> {
        let entry = |action, reason| {
            AuditEntry::new(input.student_id.as_str(), action, reason)
                .actor(Some(input.registered_by.as_str()))
                .notes(input.notes.as_deref())
                .meta(meta)
        };

        if let Err(e) = input.validate() {
            get_metrics().record_registration_failed();
            self.audit
                .record(
                    entry(AuditAction::RegisterFailed, ReasonCode::InvalidInput)
                        .details(json!({ "error": e.to_string() })),
                )
                .await;
            return Err(e.into());
        }

        let today = self.clock.today();
        let deadline = deadline.unwrap_or(self.policy.timeout);
        let result = with_deadline(deadline, self.register_in_transaction(&input, today)).await;

        match &result {
            Ok(outcome) => {
                let (action, reason) = match outcome.outcome {
                    RegistrationOutcome::Registered => {
                        get_metrics().record_registration_created();
                        (AuditAction::RegisterSucceeded, ReasonCode::Granted)
                    }
                    RegistrationOutcome::PolicyDenied(reason) => {
                        get_metrics().record_registration_denied();
                        (AuditAction::RegisterDenied, reason.reason_code())
                    }
                    RegistrationOutcome::AlreadyRegistered => {
                        get_metrics().record_registration_conflict();
                        (AuditAction::RegisterConflict, ReasonCode::AlreadyRegistered)
                    }
                };

                info!(
                    student_id = %input.student_id,
                    semester_period_id = %input.semester_period_id,
                    outcome = outcome.outcome.code(),
                    "Registration attempt completed"
                );

                self.audit
                    .record(
                        entry(action, reason)
                            .registration(outcome.registration_id())
                            .payment_approval(outcome.verdict.payment_approval_id.as_deref())
                            .details(json!({
                                "semesterPeriodId": input.semester_period_id,
                                "outcome": outcome.outcome.code(),
                                "verdict": outcome.verdict,
                            })),
                    )
                    .await;
            }
            Err(e) => {
                get_metrics().record_registration_failed();
                let reason = match e {
                    AppError::Validation(_) => ReasonCode::InvalidInput,
                    AppError::Timeout(_) => ReasonCode::Timeout,
                    _ => {
                        get_metrics().record_db_error();
                        ReasonCode::DatastoreError
                    }
                };

                warn!(
                    student_id = %input.student_id,
                    semester_period_id = %input.semester_period_id,
                    error = %e,
                    "Registration attempt failed"
                );

                self.audit
                    .record(
                        entry(AuditAction::RegisterFailed, reason).details(json!({
                            "semesterPeriodId": input.semester_period_id,
                            "error": e.to_string(),
                        })),
                    )
                    .await;
            }
        }

        result
    }

    async fn register_in_transaction(
        &self,
        input: &RegisterStudentInput,
        today: NaiveDate,
    ) -> AppResult<RegistrationResult> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let period = SemesterPeriodRepository::find_by_id_in(&txn, &input.semester_period_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "unknown semester period {}",
                    input.semester_period_id
                ))
            })?;

        let approvals =
            PaymentApprovalRepository::lock_effective_in(&txn, &input.student_id, today).await?;
        let records = FinancialRecordRepository::find_by_student_in(&txn, &input.student_id).await?;
        let financial = FinancialSummary::from_records(&records);

        let payment = policy::payment_standing(&approvals, today);
        let verdict = policy::decide(
            &PolicyInputs {
                financial,
                approvals,
                ..Default::default()
            },
            today,
        );

        let Some(approval) = payment.approval else {
            let reason = policy::payment_denial(&financial, false)
                .unwrap_or(DenialReason::PaymentNotApproved);
            return Ok(RegistrationResult::denied(reason, verdict));
        };

        if self.policy.require_open_window && !period.registration_window_open(today) {
            return Ok(RegistrationResult::denied(
                DenialReason::RegistrationWindowClosed,
                verdict,
            ));
        }

        if RegistrationRepository::find_by_pair_in(
            &txn,
            &input.student_id,
            &input.semester_period_id,
        )
        .await?
        .is_some()
        {
            return Ok(RegistrationResult::already_registered(verdict));
        }

        let model = student_semester_registration::ActiveModel {
            id: Set(self.id_gen.generate()),
            student_id: Set(input.student_id.clone()),
            semester_period_id: Set(period.id.clone()),
            registration_date: Set(Utc::now().into()),
            registered_by: Set(input.registered_by.clone()),
            approved_by: Set(None),
            approval_date: Set(None),
            status: Set(RegistrationStatus::Pending),
            payment_approval_id: Set(Some(approval.id.clone())),
            notes: Set(input.notes.clone()),
            updated_at: Set(None),
        };

        let registration = match RegistrationRepository::create_in(&txn, model).await {
            Ok(registration) => registration,
            // Lost the race on the unique index; the transaction rolls back on drop.
            Err(AppError::Conflict(_)) => {
                return Ok(RegistrationResult::already_registered(verdict));
            }
            Err(e) => return Err(e),
        };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(RegistrationResult {
            outcome: RegistrationOutcome::Registered,
            registration: Some(registration),
            message: "registered; awaiting review".to_string(),
            verdict,
        })
    }
}
