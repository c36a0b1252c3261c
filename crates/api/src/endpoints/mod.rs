//! API endpoints.

#![allow(missing_docs)]

mod access;
mod audit;
mod metrics;
mod payment_approvals;
mod registrations;
mod semesters;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/access", access::router())
        .nest("/registrations", registrations::router())
        .nest("/payment-approvals", payment_approvals::router())
        .nest("/semesters", semesters::router())
        .nest("/audit", audit::router())
        .nest("/metrics", metrics::router())
}
