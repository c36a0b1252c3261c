//! Semester registration endpoints.

use axum::{Json, Router, extract::State, routing::post};
use campus_common::{AppError, AppResult};
use campus_core::{AccessVerdict, RegisterStudentInput, RegistrationResult};
use campus_db::entities::student_semester_registration::{self, RegistrationStatus};
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
        .route("/cancel", post(cancel))
        .route("/show", post(show))
        .route("/list", post(list))
}

/// Registration response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub student_id: String,
    pub semester_period_id: String,
    pub registration_date: String,
    pub registered_by: String,
    pub approved_by: Option<String>,
    pub approval_date: Option<String>,
    pub status: String,
    pub payment_approval_id: Option<String>,
    pub notes: Option<String>,
    pub updated_at: Option<String>,
}

impl From<student_semester_registration::Model> for RegistrationResponse {
    fn from(r: student_semester_registration::Model) -> Self {
        Self {
            id: r.id,
            student_id: r.student_id,
            semester_period_id: r.semester_period_id,
            registration_date: r.registration_date.to_rfc3339(),
            registered_by: r.registered_by,
            approved_by: r.approved_by,
            approval_date: r.approval_date.map(|d| d.to_rfc3339()),
            status: r.status.as_str().to_string(),
            payment_approval_id: r.payment_approval_id,
            notes: r.notes,
            updated_at: r.updated_at.map(|d| d.to_rfc3339()),
        }
    }
}

/// Outcome of a registration attempt.
///
/// Policy denials and duplicates are reported here with `success = false`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub outcome: &'static str,
    pub registration_id: Option<String>,
    pub message: String,
    pub registration: Option<RegistrationResponse>,
    pub verdict: AccessVerdict,
}

impl From<RegistrationResult> for RegisterResponse {
    fn from(result: RegistrationResult) -> Self {
        Self {
            success: result.success(),
            outcome: result.outcome.code(),
            registration_id: result.registration_id().map(ToString::to_string),
            message: result.message,
            registration: result.registration.map(Into::into),
            verdict: result.verdict,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationRequest {
    pub student_id: String,
    pub semester_period_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRegistrationRequest {
    #[validate(length(min = 1, max = 64))]
    pub registration_id: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowRegistrationRequest {
    pub registration_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListRegistrationsRequest {
    pub student_id: Option<String>,
    pub semester_period_id: Option<String>,
    pub status: Option<RegistrationStatus>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    20
}

/// Register a student for a semester period (staff only).
async fn create(
    actor: Actor,
    Meta(meta): Meta,
    State(state): State<AppState>,
    Json(req): Json<CreateRegistrationRequest>,
) -> AppResult<ApiResponse<RegisterResponse>> {
    actor.require_staff()?;

    info!(
        actor_id = %actor.id,
        student_id = %req.student_id,
        semester_period_id = %req.semester_period_id,
        "Registering student"
    );

    let input = RegisterStudentInput {
        student_id: req.student_id,
        semester_period_id: req.semester_period_id,
        registered_by: actor.id,
        notes: req.notes,
    };

    let result = state
        .registration_service
        .register_student(input, &meta, None)
        .await?;

    Ok(ApiResponse::ok(result.into()))
}

/// Approve a pending registration (staff only).
async fn approve(
    actor: Actor,
    Meta(meta): Meta,
    State(state): State<AppState>,
    Json(req): Json<ReviewRegistrationRequest>,
) -> AppResult<ApiResponse<RegistrationResponse>> {
    actor.require_staff()?;
    req.validate()?;

    let registration = state
        .registration_review_service
        .approve(&actor.id, &req.registration_id, req.notes.as_deref(), &meta)
        .await?;

    Ok(ApiResponse::ok(registration.into()))
}

/// Reject a pending registration (staff only).
async fn reject(
    actor: Actor,
    Meta(meta): Meta,
    State(state): State<AppState>,
    Json(req): Json<ReviewRegistrationRequest>,
) -> AppResult<ApiResponse<RegistrationResponse>> {
    actor.require_staff()?;
    req.validate()?;

    let registration = state
        .registration_review_service
        .reject(&actor.id, &req.registration_id, req.notes.as_deref(), &meta)
        .await?;

    Ok(ApiResponse::ok(registration.into()))
}

/// Cancel a pending or approved registration (staff only).
async fn cancel(
    actor: Actor,
    Meta(meta): Meta,
    State(state): State<AppState>,
    Json(req): Json<ReviewRegistrationRequest>,
) -> AppResult<ApiResponse<RegistrationResponse>> {
    actor.require_staff()?;
    req.validate()?;

    let registration = state
        .registration_review_service
        .cancel(&actor.id, &req.registration_id, req.notes.as_deref(), &meta)
        .await?;

    Ok(ApiResponse::ok(registration.into()))
}

/// Show one registration. Students may read their own.
async fn show(
    actor: Actor,
    State(state): State<AppState>,
    Json(req): Json<ShowRegistrationRequest>,
) -> AppResult<ApiResponse<RegistrationResponse>> {
    let registration = state
        .registration_review_service
        .get(&req.registration_id)
        .await?;

    if !actor.is_staff() && registration.student_id != actor.id {
        // Don't reveal other students' registrations.
        return Err(AppError::NotFound(format!(
            "Registration {}",
            req.registration_id
        )));
    }

    Ok(ApiResponse::ok(registration.into()))
}

/// List registrations by period (staff) or by student.
async fn list(
    actor: Actor,
    State(state): State<AppState>,
    Json(req): Json<ListRegistrationsRequest>,
) -> AppResult<ApiResponse<Vec<RegistrationResponse>>> {
    req.validate()?;
    let limit = req.limit;

    let registrations = if let Some(period_id) = req.semester_period_id {
        actor.require_staff()?;
        state
            .registration_review_service
            .list_for_period(&period_id, req.status, limit, req.offset)
            .await?
    } else {
        let student_id = req.student_id.unwrap_or_else(|| actor.id.clone());
        if !actor.is_staff() && student_id != actor.id {
            return Err(AppError::Forbidden(
                "Students can only list their own registrations".to_string(),
            ));
        }
        state
            .registration_review_service
            .list_for_student(&student_id, limit, req.offset)
            .await?
    };

    Ok(ApiResponse::ok(
        registrations.into_iter().map(Into::into).collect(),
    ))
}
