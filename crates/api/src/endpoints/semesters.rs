//! Semester period administration endpoints.

use axum::{Json, Router, extract::State, routing::post};
use campus_common::AppResult;
use campus_core::CreateSemesterPeriodInput;
use campus_db::entities::semester_period;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{extractors::Actor, middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/list", post(list))
        .route("/show", post(show))
        .route("/activate", post(activate))
        .route("/deactivate", post(deactivate))
        .route("/open-registration", post(open_registration))
        .route("/close-registration", post(close_registration))
        .route("/current", post(current))
}

/// Semester period response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterPeriodResponse {
    pub id: String,
    pub name: String,
    pub academic_year: String,
    pub semester: i16,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub registration_start_date: NaiveDate,
    pub registration_end_date: NaiveDate,
    pub is_active: bool,
    pub is_registration_open: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<semester_period::Model> for SemesterPeriodResponse {
    fn from(p: semester_period::Model) -> Self {
        Self {
            id: p.id,
            name: p.name,
            academic_year: p.academic_year,
            semester: p.semester,
            start_date: p.start_date,
            end_date: p.end_date,
            registration_start_date: p.registration_start_date,
            registration_end_date: p.registration_end_date,
            is_active: p.is_active,
            is_registration_open: p.is_registration_open,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.map(|d| d.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterIdRequest {
    pub semester_period_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListSemestersRequest {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    20
}

/// Create a semester period (admin only).
async fn create(
    actor: Actor,
    State(state): State<AppState>,
    Json(input): Json<CreateSemesterPeriodInput>,
) -> AppResult<ApiResponse<SemesterPeriodResponse>> {
    actor.require_admin()?;

    info!(actor_id = %actor.id, name = %input.name, "Creating semester period");

    let period = state.semester_period_service.create(input).await?;
    Ok(ApiResponse::ok(period.into()))
}

/// List semester periods, newest first.
async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListSemestersRequest>,
) -> AppResult<ApiResponse<Vec<SemesterPeriodResponse>>> {
    req.validate()?;

    let periods = state
        .semester_period_service
        .list(req.limit, req.offset)
        .await?;

    Ok(ApiResponse::ok(periods.into_iter().map(Into::into).collect()))
}

async fn show(
    State(state): State<AppState>,
    Json(req): Json<SemesterIdRequest>,
) -> AppResult<ApiResponse<SemesterPeriodResponse>> {
    let period = state
        .semester_period_service
        .get(&req.semester_period_id)
        .await?;
    Ok(ApiResponse::ok(period.into()))
}

async fn activate(
    actor: Actor,
    State(state): State<AppState>,
    Json(req): Json<SemesterIdRequest>,
) -> AppResult<ApiResponse<SemesterPeriodResponse>> {
    actor.require_admin()?;

    info!(actor_id = %actor.id, semester_period_id = %req.semester_period_id, "Activating semester period");

    let period = state
        .semester_period_service
        .activate(&req.semester_period_id)
        .await?;
    Ok(ApiResponse::ok(period.into()))
}

async fn deactivate(
    actor: Actor,
    State(state): State<AppState>,
    Json(req): Json<SemesterIdRequest>,
) -> AppResult<ApiResponse<SemesterPeriodResponse>> {
    actor.require_admin()?;

    info!(actor_id = %actor.id, semester_period_id = %req.semester_period_id, "Deactivating semester period");

    let period = state
        .semester_period_service
        .deactivate(&req.semester_period_id)
        .await?;
    Ok(ApiResponse::ok(period.into()))
}

async fn open_registration(
    actor: Actor,
    State(state): State<AppState>,
    Json(req): Json<SemesterIdRequest>,
) -> AppResult<ApiResponse<SemesterPeriodResponse>> {
    actor.require_admin()?;

    info!(actor_id = %actor.id, semester_period_id = %req.semester_period_id, "Opening registration");

    let period = state
        .semester_period_service
        .open_registration(&req.semester_period_id)
        .await?;
    Ok(ApiResponse::ok(period.into()))
}

async fn close_registration(
    actor: Actor,
    State(state): State<AppState>,
    Json(req): Json<SemesterIdRequest>,
) -> AppResult<ApiResponse<SemesterPeriodResponse>> {
    actor.require_admin()?;

    info!(actor_id = %actor.id, semester_period_id = %req.semester_period_id, "Closing registration");

    let period = state
        .semester_period_service
        .close_registration(&req.semester_period_id)
        .await?;
    Ok(ApiResponse::ok(period.into()))
}

/// The active period containing today, if any.
async fn current(
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Option<SemesterPeriodResponse>>> {
    let period = state.semester_period_service.current_active().await?;
    Ok(ApiResponse::ok(period.map(Into::into)))
}
