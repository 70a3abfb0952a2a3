//! Application error types.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bazaar_core::auth::AuthError;
use bazaar_core::store::StoreError;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::Validation(errors) if errors.len() > 1 => Some(errors.clone()),
            _ => None,
        };
        let message = match &self {
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                "Internal server error".to_string()
            }
            AppError::StoreUnavailable(detail) => {
                warn!(%detail, "store unavailable");
                "Service temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorResponse {
            success: false,
            error: self.code().to_string(),
            message,
            details,
        });
        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Timeout { .. } | StoreError::Unavailable(_) => {
                AppError::StoreUnavailable(e.to_string())
            }
            StoreError::Conflict { field } => {
                AppError::Conflict(format!("Duplicate value for '{field}'"))
            }
            StoreError::Db(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
            ) => AppError::StoreUnavailable(e.to_string()),
            StoreError::Db(_) | StoreError::Serde(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(errors) => AppError::Validation(errors),
            AuthError::Conflict => AppError::Conflict(e.to_string()),
            AuthError::InvalidCredentials | AuthError::Deactivated | AuthError::Unauthenticated => {
                AppError::Unauthorized(e.to_string())
            }
            AuthError::PendingApproval(_) | AuthError::Forbidden(_) => {
                AppError::Forbidden(e.to_string())
            }
            AuthError::NotFound(_) => AppError::NotFound(e.to_string()),
            AuthError::Token(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::Store(store) => AppError::from(store),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}
