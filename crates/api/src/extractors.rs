//! Request extractors.
//!
//! Identity is established upstream: the gateway in front of this service
//! authenticates the caller and forwards `x-actor-id` / `x-actor-role`.

use axum::{extract::FromRequestParts, http::request::Parts};
use campus_common::AppError;
use campus_core::RequestMeta;

/// Header carrying the authenticated actor id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the authenticated actor role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Role of the calling actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A student acting on their own record.
    Student,
    /// Accounts-office staff.
    Accountant,
    /// Administrator.
    Admin,
}

impl Role {
    /// Parse a header value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "accountant" => Some(Self::Accountant),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Authenticated actor extractor.
#[derive(Debug, Clone)]
pub struct Actor {
    /// Actor id (student id for students).
    pub id: String,
    /// Actor role.
    pub role: Role,
}

impl Actor {
    /// Accounts-office staff or administrator.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self.role, Role::Accountant | Role::Admin)
    }

    /// Administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Fail with `Forbidden` unless the actor is staff.
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only accounts-office staff can do this".to_string(),
            ))
        }
    }

    /// Fail with `Forbidden` unless the actor is an administrator.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only administrators can do this".to_string(),
            ))
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn actor_from_parts(parts: &Parts) -> Result<Option<Actor>, AppError> {
    let Some(id) = header(parts, ACTOR_ID_HEADER) else {
        return Ok(None);
    };
    let role = match header(parts, ACTOR_ROLE_HEADER) {
        Some(value) => Role::parse(value)
            .ok_or_else(|| AppError::BadRequest(format!("unknown actor role: {value}")))?,
        None => Role::Student,
    };

    Ok(Some(Actor {
        id: id.to_string(),
        role,
    }))
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_parts(parts)?.ok_or(AppError::Unauthorized)
    }
}

/// Optional actor extractor.
#[derive(Debug, Clone)]
pub struct MaybeActor(pub Option<Actor>);

impl<S> FromRequestParts<S> for MaybeActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(actor_from_parts(parts)?))
    }
}

/// Request metadata recorded alongside audit entries.
#[derive(Debug, Clone, Default)]
pub struct Meta(pub RequestMeta);

impl<S> FromRequestParts<S> for Meta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // First hop of x-forwarded-for is the client.
        let origin = header(parts, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header(parts, "x-real-ip"))
            .map(ToString::to_string);
        let user_agent = header(parts, "user-agent").map(ToString::to_string);

        Ok(Self(RequestMeta { origin, user_agent }))
    }
}
