//! Session token issuance and verification.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;

use super::AuthError;
use crate::models::auth::{Role, TokenClaims};

/// Issue a signed session token (HS256) for `(id, role)`.
pub fn issue_token(
    id: &str,
    role: Role,
    secret: &[u8],
    ttl: Duration,
) -> Result<(String, TokenClaims), AuthError> {
    let now = Utc::now();
    let claims = TokenClaims {
        id: id.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Token(format!("jwt encode: {e}")))?;
    Ok((token, claims))
}

/// Verify signature and expiry, returning the claims on success.
pub fn verify_token(token: &str, secret: &[u8]) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;
    decode::<TokenClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// Resolve the signing secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bazaar")
        .join("jwt-secret")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn issued_token_verifies() {
        let (token, claims) =
            issue_token("abc", Role::Seller, SECRET, Duration::days(30)).unwrap();
        let decoded = verify_token(&token, SECRET).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.role, Role::Seller);
        assert_eq!(decoded.exp - decoded.iat, 30 * 24 * 3600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) = issue_token("abc", Role::Customer, SECRET, Duration::days(1)).unwrap();
        assert!(verify_token(&token, b"other").is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let (token, _) =
            issue_token("abc", Role::Customer, SECRET, Duration::seconds(-10)).unwrap();
        assert!(verify_token(&token, SECRET).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_token("not.a.token", SECRET).is_none());
        assert!(verify_token("", SECRET).is_none());
    }

    #[test]
    fn same_second_tokens_differ() {
        let (a, _) = issue_token("abc", Role::Admin, SECRET, Duration::days(1)).unwrap();
        let (b, _) = issue_token("abc", Role::Admin, SECRET, Duration::days(1)).unwrap();
        assert_ne!(a, b);
    }
}
