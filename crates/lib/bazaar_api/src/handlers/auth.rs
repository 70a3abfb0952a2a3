//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bazaar_core::auth::Registered;
use bazaar_core::models::auth::{LoginInput, RegistrationInput};

use super::AppJson;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{AuthenticatedUser, bearer};
use crate::models::{MessageResponse, PendingResponse, ProfileResponse, SessionResponse};

/// `POST /auth/register`: create a customer, seller or deliverer account.
///
/// Customers get a session straight away. Sellers and deliverers get `201`
/// with `status: "pending"` and no token.
pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegistrationInput>,
) -> AppResult<Response> {
    let resp = match state.auth.register(&body).await? {
        Registered::Session(session) => (
            StatusCode::CREATED,
            Json(SessionResponse::new("Registration successful", session)),
        )
            .into_response(),
        Registered::PendingApproval(user) => (
            StatusCode::CREATED,
            Json(PendingResponse {
                success: true,
                message: format!(
                    "Registration successful. Your {} account is pending admin approval.",
                    user.role
                ),
                status: "pending",
                user,
            }),
        )
            .into_response(),
    };
    Ok(resp)
}

/// `POST /auth/login`: authenticate with email + password, optionally for one role.
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginInput>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.auth.login(&body).await?;
    Ok(Json(SessionResponse::new("Login successful", session)))
}

/// `POST /auth/logout`: revoke the bearer token. Always succeeds.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<MessageResponse> {
    state.auth.logout(bearer(&headers));
    Json(MessageResponse::new("Logged out successfully"))
}

/// `GET /auth/me`: current profile, read fresh from the store.
pub async fn me_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state.auth.profile(&user.0).await?;
    Ok(Json(ProfileResponse {
        success: true,
        user: profile,
    }))
}
