//! Access evaluation endpoint.

use axum::{Json, Router, extract::State, routing::post};
use campus_common::{AppError, AppResult};
use campus_core::AccessVerdict;
use serde::Deserialize;

use crate::{
    extractors::{Actor, Meta},
    middleware::AppState,
    response::ApiResponse,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/evaluate", post(evaluate))
}

/// Evaluate request. Students omit `studentId` and get their own verdict.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub student_id: Option<String>,
}

/// Work out whose access the caller may evaluate.
fn subject(actor: &Actor, requested: Option<String>) -> AppResult<String> {
    match requested {
        Some(id) if actor.is_staff() || id == actor.id => Ok(id),
        Some(_) => Err(AppError::Forbidden(
            "Students can only evaluate their own access".to_string(),
        )),
        None if actor.is_staff() => Err(AppError::Validation(
            "studentId is required".to_string(),
        )),
        None => Ok(actor.id.clone()),
    }
}

async fn evaluate(
    actor: Actor,
    Meta(meta): Meta,
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> AppResult<ApiResponse<AccessVerdict>> {
    let student_id = subject(&actor, req.student_id)?;

    let verdict = state
        .access_service
        .evaluate(&student_id, Some(&actor.id), &meta)
        .await?;

    Ok(ApiResponse::ok(verdict))
}
