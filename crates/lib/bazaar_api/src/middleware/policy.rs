//! Gate enforcement for protected routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use bazaar_core::auth::{AccessPolicy, Gate};

use super::auth::AuthenticatedUser;
use crate::error::AppError;

/// Middleware state: the policy and the gate one route requires.
#[derive(Clone)]
pub struct Guard {
    pub policy: AccessPolicy,
    pub gate: Gate,
}

/// Axum middleware: checks the request's principal against the route's gate.
/// Must run inside [`super::auth::require_auth`].
pub async fn enforce(
    State(guard): State<Guard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("Not authorized to access this route".into()))?;
    guard.policy.check(&user.0, guard.gate).await?;
    Ok(next.run(request).await)
}
