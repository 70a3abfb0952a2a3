//! Authentication and authorization.
//!
//! Registration and login ([`authenticator`]), per-request token
//! verification ([`session`]), route gates and ownership rules ([`policy`]),
//! admin account management ([`accounts`]) and the logout revocation list
//! ([`revocation`]).

pub mod accounts;
pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod policy;
pub mod revocation;
pub mod session;
pub mod validation;

use chrono::Duration;
use thiserror::Error;

use crate::models::auth::Role;
use crate::store::StoreError;

pub use accounts::AccountAdmin;
pub use authenticator::{Authenticator, Registered, Session};
pub use password::{BcryptHasher, PasswordHasher};
pub use policy::{AccessPolicy, Gate};
pub use revocation::RevocationList;
pub use session::SessionVerifier;

/// Default session lifetime.
pub const DEFAULT_TOKEN_DAYS: i64 = 30;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Email already registered. Please use a different email address")]
    Conflict,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated. Please contact administrator")]
    Deactivated,

    #[error("Your {0} account is pending admin approval. Please wait for approval")]
    PendingApproval(Role),

    #[error("Not authorized to access this route")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }
}

/// Token signing settings shared by the authenticator and verifier.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: Vec<u8>,
    pub token_ttl: Duration,
}

impl AuthSettings {
    pub fn new(jwt_secret: impl Into<Vec<u8>>, token_days: i64) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::days(token_days),
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"[redacted]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}
