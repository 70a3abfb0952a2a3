//! Authentication middleware: bearer token extraction and session verification.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use bazaar_core::auth::{AuthError, SessionVerifier};
use bazaar_core::models::auth::Principal;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Key used to store the verified [`Principal`] in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

/// The principal if the request carried a valid token, otherwise `None`.
/// Only populated on routes behind [`optional_auth`] or [`require_auth`].
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Principal>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|user| user.0.clone()),
        ))
    }
}

/// Raw bearer token from the `Authorization` header.
pub fn bearer(headers: &HeaderMap) -> Option<&str> {
    SessionVerifier::bearer_token(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()))
}

/// Axum middleware: verifies `Authorization: Bearer <token>` and injects
/// [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = state.sessions.verify(bearer(request.headers())).await?;
    request.extensions_mut().insert(AuthenticatedUser(principal));
    Ok(next.run(request).await)
}

/// Like [`require_auth`], but lets anonymous requests through. A token that
/// fails verification is treated as absent.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer(request.headers());
    if token.is_some() {
        match state.sessions.verify(token).await {
            Ok(principal) => {
                request.extensions_mut().insert(AuthenticatedUser(principal));
            }
            Err(AuthError::Store(e)) => return Err(e.into()),
            Err(err) => debug!(%err, "ignoring unusable token on public route"),
        }
    }
    Ok(next.run(request).await)
}
