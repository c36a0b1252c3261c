//! Payment approval endpoints.

use axum::{Json, Router, extract::State, routing::post};
use campus_common::{AppError, AppResult};
use campus_core::{PaymentApprovalService, RecordPaymentInput};
use campus_db::entities::payment_approval;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    extractors::{Actor, Meta},
    middleware::AppState,
    response::ApiResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/approve", post(approve))
        .route("/reject", post(reject))
        .route("/revoke", post(revoke))
        .route("/show", post(show))
        .route("/list", post(list))
}

/// Payment approval response.
///
/// `status` is what is stored; `effectiveStatus` reports `expired` once the
/// access window has passed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentApprovalResponse {
    pub id: String,
    pub student_id: String,
    pub payment_id: Option<String>,
    pub amount_paid: Decimal,
    pub payment_reference: Option<String>,
    pub payment_date: NaiveDate,
    pub approved_by: Option<String>,
    pub approval_date: Option<String>,
    pub access_valid_from: NaiveDate,
    pub access_valid_until: NaiveDate,
    pub status: String,
    pub effective_status: String,
    pub notes: Option<String>,
    pub auto_expire: bool,
    pub revoked_by: Option<String>,
    pub revoked_at: Option<String>,
    pub revocation_reason: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl PaymentApprovalResponse {
    fn new(service: &PaymentApprovalService, a: payment_approval::Model) -> Self {
        let effective_status = service.effective_status(&a).as_str().to_string();
        Self {
            id: a.id,
            student_id: a.student_id,
            payment_id: a.payment_id,
            amount_paid: a.amount_paid,
            payment_reference: a.payment_reference,
            payment_date: a.payment_date,
            approved_by: a.approved_by,
            approval_date: a.approval_date.map(|d| d.to_rfc3339()),
            access_valid_from: a.access_valid_from,
            access_valid_until: a.access_valid_until,
            status: a.status.as_str().to_string(),
            effective_status,
            notes: a.notes,
            auto_expire: a.auto_expire,
            revoked_by: a.revoked_by,
            revoked_at: a.revoked_at.map(|d| d.to_rfc3339()),
            revocation_reason: a.revocation_reason,
            created_at: a.created_at.to_rfc3339(),
            updated_at: a.updated_at.map(|d| d.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPaymentRequest {
    #[validate(length(min = 1, max = 64))]
    pub approval_id: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RevokePaymentRequest {
    #[validate(length(min = 1, max = 64))]
    pub approval_id: String,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowPaymentRequest {
    pub approval_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentsRequest {
    pub student_id: Option<String>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    20
}

/// Record a payment awaiting review (staff only).
async fn create(
    actor: Actor,
    Meta(meta): Meta,
    State(state): State<AppState>,
    Json(input): Json<RecordPaymentInput>,
) -> AppResult<ApiResponse<PaymentApprovalResponse>> {
    actor.require_staff()?;

    info!(actor_id = %actor.id, student_id = %input.student_id, "Recording payment");

    let service = &state.payment_approval_service;
    let approval = service.record_payment(&actor.id, input, &meta).await?;

    Ok(ApiResponse::ok(PaymentApprovalResponse::new(service, approval)))
}

/// Approve a pending payment (staff only).
async fn approve(
    actor: Actor,
    Meta(meta): Meta,
    State(state): State<AppState>,
    Json(req): Json<ReviewPaymentRequest>,
) -> AppResult<ApiResponse<PaymentApprovalResponse>> {
    actor.require_staff()?;
    req.validate()?;

    let service = &state.payment_approval_service;
    let approval = service
        .approve(&actor.id, &req.approval_id, req.notes.as_deref(), &meta)
        .await?;

    Ok(ApiResponse::ok(PaymentApprovalResponse::new(service, approval)))
}

/// Reject a pending payment (staff only).
async fn reject(
    actor: Actor,
    Meta(meta): Meta,
    State(state): State<AppState>,
    Json(req): Json<ReviewPaymentRequest>,
) -> AppResult<ApiResponse<PaymentApprovalResponse>> {
    actor.require_staff()?;
    req.validate()?;

    let service = &state.payment_approval_service;
    let approval = service
        .reject(&actor.id, &req.approval_id, req.notes.as_deref(), &meta)
        .await?;

    Ok(ApiResponse::ok(PaymentApprovalResponse::new(service, approval)))
}

/// Revoke an approval (staff only).
async fn revoke(
    actor: Actor,
    Meta(meta): Meta,
    State(state): State<AppState>,
    Json(req): Json<RevokePaymentRequest>,
) -> AppResult<ApiResponse<PaymentApprovalResponse>> {
    actor.require_staff()?;
    req.validate()?;

    info!(actor_id = %actor.id, approval_id = %req.approval_id, "Revoking payment approval");

    let service = &state.payment_approval_service;
    let approval = service
        .revoke(&actor.id, &req.approval_id, &req.reason, &meta)
        .await?;

    Ok(ApiResponse::ok(PaymentApprovalResponse::new(service, approval)))
}

/// Show one approval. Students may read their own.
async fn show(
    actor: Actor,
    State(state): State<AppState>,
    Json(req): Json<ShowPaymentRequest>,
) -> AppResult<ApiResponse<PaymentApprovalResponse>> {
    let service = &state.payment_approval_service;
    let approval = service.get(&req.approval_id).await?;

    if !actor.is_staff() && approval.student_id != actor.id {
        return Err(AppError::NotFound(format!(
            "Payment approval {}",
            req.approval_id
        )));
    }

    Ok(ApiResponse::ok(PaymentApprovalResponse::new(service, approval)))
}

/// List a student's approvals, newest first.
async fn list(
    actor: Actor,
    State(state): State<AppState>,
    Json(req): Json<ListPaymentsRequest>,
) -> AppResult<ApiResponse<Vec<PaymentApprovalResponse>>> {
    req.validate()?;

    let student_id = req.student_id.unwrap_or_else(|| actor.id.clone());
    if !actor.is_staff() && student_id != actor.id {
        return Err(AppError::Forbidden(
            "Students can only list their own payments".to_string(),
        ));
    }

    let service = &state.payment_approval_service;
    let approvals = service
        .list_for_student(&student_id, req.limit, req.offset)
        .await?;

    Ok(ApiResponse::ok(
        approvals
            .into_iter()
            .map(|a| PaymentApprovalResponse::new(service, a))
            .collect(),
    ))
}
