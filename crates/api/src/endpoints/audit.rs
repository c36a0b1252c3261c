//! Audit log endpoint.

use axum::{Json, Router, extract::State, routing::post};
use campus_common::AppResult;
use campus_core::AuditQuery;
use campus_db::entities::access_control_log;
use serde::Serialize;

use crate::{extractors::Actor, middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/list", post(list))
}

/// Audit log entry response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryResponse {
    pub id: String,
    pub student_id: String,
    pub action: String,
    pub reason: String,
    pub payment_approval_id: Option<String>,
    pub registration_id: Option<String>,
    pub actor_id: Option<String>,
    pub notes: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl From<access_control_log::Model> for AuditEntryResponse {
    fn from(e: access_control_log::Model) -> Self {
        Self {
            id: e.id,
            student_id: e.student_id,
            action: e.action.as_str().to_string(),
            reason: e.reason.as_str().to_string(),
            payment_approval_id: e.payment_approval_id,
            registration_id: e.registration_id,
            actor_id: e.actor_id,
            notes: e.notes,
            details: e.details,
            ip_address: e.ip_address,
            user_agent: e.user_agent,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

/// Query the audit trail (staff only).
async fn list(
    actor: Actor,
    State(state): State<AppState>,
    Json(query): Json<AuditQuery>,
) -> AppResult<ApiResponse<Vec<AuditEntryResponse>>> {
    actor.require_staff()?;

    let entries = state.audit_service.query(query).await?;
    Ok(ApiResponse::ok(entries.into_iter().map(Into::into).collect()))
}
