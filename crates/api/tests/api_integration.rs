//! API integration tests.
//!
//! These tests drive the router end to end against mock databases.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use campus_api::{middleware::AppState, router as api_router};
use campus_core::{
    AccessService, AuditLogger, AuditService, FixedClock, MemoryAuditSink,
    PaymentApprovalService, RegistrationPolicy, RegistrationReviewService, RegistrationService,
    SemesterPeriodService,
};
use campus_db::entities::{
    access_control_log::AuditAction, financial_record, payment_approval,
    payment_approval::PaymentApprovalStatus, semester_period, student_semester_registration,
    student_semester_registration::RegistrationStatus,
};
use campus_db::repositories::{
    AccessControlLogRepository, FinancialRecordRepository, PaymentApprovalRepository,
    RegistrationRepository, SemesterPeriodRepository,
};
use campus_db::test_utils::fixtures::{self, date};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Rows the access evaluator will read.
#[derive(Default)]
struct AccessRows {
    financial: Vec<financial_record::Model>,
    approvals: Vec<payment_approval::Model>,
    registrations: Vec<student_semester_registration::Model>,
    periods: Vec<semester_period::Model>,
}

fn empty_db() -> Arc<DatabaseConnection> {
    Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

fn db_with<M>(rows: Vec<M>) -> Arc<DatabaseConnection>
where
    M: sea_orm::IntoMockRow,
{
    Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows])
            .into_connection(),
    )
}

/// Build state where the evaluator reads `access` and the registration
/// workflow runs its transaction against `registration_db`.
fn create_test_state(
    access: AccessRows,
    registration_db: MockDatabase,
) -> (AppState, MemoryAuditSink) {
    let sink = MemoryAuditSink::new();
    let audit = AuditLogger::new(Arc::new(sink.clone()));
    let clock = Arc::new(FixedClock(date(2024, 3, 15)));

    let access_service = AccessService::new(
        PaymentApprovalRepository::new(db_with(access.approvals)),
        RegistrationRepository::new(db_with(access.registrations)),
        SemesterPeriodRepository::new(db_with(access.periods)),
        FinancialRecordRepository::new(db_with(access.financial)),
        audit.clone(),
        clock.clone(),
    );
    let registration_service = RegistrationService::new(
        Arc::new(registration_db.into_connection()),
        audit.clone(),
        clock.clone(),
        RegistrationPolicy::default(),
    );
    let payment_approval_service = PaymentApprovalService::new(
        PaymentApprovalRepository::new(empty_db()),
        audit.clone(),
        clock.clone(),
    );
    let registration_review_service =
        RegistrationReviewService::new(RegistrationRepository::new(empty_db()), audit);
    let semester_period_service =
        SemesterPeriodService::new(SemesterPeriodRepository::new(empty_db()), clock);
    let audit_service = AuditService::new(AccessControlLogRepository::new(empty_db()));

    let state = AppState {
        access_service,
        registration_service,
        payment_approval_service,
        registration_review_service,
        semester_period_service,
        audit_service,
    };
    (state, sink)
}

fn create_test_router(access: AccessRows, registration_db: MockDatabase) -> (Router, MemoryAuditSink) {
    let (state, sink) = create_test_state(access, registration_db);
    (api_router().with_state(state), sink)
}

fn empty_router() -> Router {
    create_test_router(
        AccessRows::default(),
        MockDatabase::new(DatabaseBackend::Postgres),
    )
    .0
}

fn post(uri: &str, actor: Option<(&str, &str)>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json");
    if let Some((id, role)) = actor {
        builder = builder
            .header("x-actor-id", id)
            .header("x-actor-role", role);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
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

fn spring_period() -> semester_period::Model {
    fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31))
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = empty_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_prometheus_endpoint() {
    let app = empty_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics/prometheus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
}

#[tokio::test]
async fn test_evaluate_without_actor_is_unauthorized() {
    let app = empty_router();

    let response = app
        .oneshot(post("/access/evaluate", None, "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_student_cannot_evaluate_another_student() {
    let (app, sink) = create_test_router(
        AccessRows::default(),
        MockDatabase::new(DatabaseBackend::Postgres),
    );

    let response = app
        .oneshot(post(
            "/access/evaluate",
            Some(("student1", "student")),
            r#"{"studentId":"student2"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    // Rejected before the evaluator runs.
    assert!(sink.entries().await.is_empty());
}

#[tokio::test]
async fn test_student_evaluates_own_access() {
    let access = AccessRows {
        approvals: vec![spring_approval()],
        ..AccessRows::default()
    };
    let (app, sink) = create_test_router(access, MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(post("/access/evaluate", Some(("student1", "student")), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["hasAccess"], true);
    assert_eq!(body["data"]["paymentApproved"], true);
    assert_eq!(body["data"]["semesterRegistered"], false);
    assert_eq!(body["data"]["accessValidUntil"], "2024-06-30");
    assert_eq!(body["data"]["denialReason"], "");

    let entries = sink.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::Evaluate);
    assert_eq!(entries[0].actor_id.as_deref(), Some("student1"));
}

#[tokio::test]
async fn test_staff_evaluates_student_without_rows() {
    let (app, _sink) = create_test_router(
        AccessRows::default(),
        MockDatabase::new(DatabaseBackend::Postgres),
    );

    let response = app
        .oneshot(post(
            "/access/evaluate",
            Some(("acc1", "accountant")),
            r#"{"studentId":"student1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["hasAccess"], false);
    assert!(
        body["data"]["denialReason"]
            .as_str()
            .unwrap()
            .starts_with("payment not approved")
    );
}

#[tokio::test]
async fn test_registration_denied_without_approval() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[spring_period()]])
        .append_query_results([Vec::<payment_approval::Model>::new()])
        .append_query_results([Vec::<financial_record::Model>::new()]);
    let (app, sink) = create_test_router(AccessRows::default(), db);

    let response = app
        .oneshot(post(
            "/registrations/create",
            Some(("acc1", "accountant")),
            r#"{"studentId":"student1","semesterPeriodId":"sp1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["outcome"], "policy_denied");
    assert!(body["data"]["registrationId"].is_null());
    assert!(
        body["data"]["message"]
            .as_str()
            .unwrap()
            .starts_with("payment not approved")
    );

    let entries = sink.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::RegisterDenied);
}

#[tokio::test]
async fn test_registration_created_with_valid_approval() {
    let created =
        fixtures::registration("reg1", "student1", "sp1", RegistrationStatus::Pending);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[spring_period()]])
        .append_query_results([[spring_approval()]])
        .append_query_results([Vec::<financial_record::Model>::new()])
        .append_query_results([Vec::<student_semester_registration::Model>::new()])
        .append_query_results([[created]]);
    let (app, sink) = create_test_router(AccessRows::default(), db);

    let response = app
        .oneshot(post(
            "/registrations/create",
            Some(("acc1", "accountant")),
            r#"{"studentId":"student1","semesterPeriodId":"sp1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["outcome"], "registered");
    assert_eq!(body["data"]["registrationId"], "reg1");
    assert_eq!(body["data"]["registration"]["status"], "pending");

    let entries = sink.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::RegisterSucceeded);
}

#[tokio::test]
async fn test_student_cannot_register() {
    let app = empty_router();

    let response = app
        .oneshot(post(
            "/registrations/create",
            Some(("student1", "student")),
            r#"{"studentId":"student1","semesterPeriodId":"sp1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_semester_writes_require_admin() {
    let app = empty_router();

    let response = app
        .oneshot(post(
            "/semesters/activate",
            Some(("acc1", "accountant")),
            r#"{"semesterPeriodId":"sp1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_audit_list_is_staff_only() {
    let app = empty_router();

    let response = app
        .oneshot(post("/audit/list", Some(("student1", "student")), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_role_is_bad_request() {
    let app = empty_router();

    let response = app
        .oneshot(post("/access/evaluate", Some(("x", "dean")), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
