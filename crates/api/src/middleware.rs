//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use campus_common::metrics::{Timer, get_metrics};
use campus_core::{
    AccessService, AuditService, PaymentApprovalService, RegistrationReviewService,
    RegistrationService, SemesterPeriodService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub access_service: AccessService,
    pub registration_service: RegistrationService,
    pub payment_approval_service: PaymentApprovalService,
    pub registration_review_service: RegistrationReviewService,
    pub semester_period_service: SemesterPeriodService,
    pub audit_service: AuditService,
}

/// Count requests and their latency.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let metrics = get_metrics();
    let timer = Timer::start();
    metrics.start_request();

    let response = next.run(req).await;

    metrics.end_request();
    metrics.record_http_request(response.status().as_u16(), timer.elapsed());
    response
}
