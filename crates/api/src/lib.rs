//! HTTP API layer for campus-access.
//!
//! This crate exposes the access-control services over JSON:
//!
//! - **Endpoints**: access evaluation, registrations, payment approvals,
//!   semester administration, audit log and metrics
//! - **Extractors**: gateway-supplied actor identity and request metadata
//! - **Middleware**: shared state and HTTP metrics
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
