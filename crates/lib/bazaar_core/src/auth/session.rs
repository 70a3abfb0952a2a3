//! Per-request session verification.

use std::sync::Arc;

use tracing::debug;

use super::jwt::verify_token;
use super::revocation::RevocationList;
use super::{AuthError, AuthSettings};
use crate::models::auth::Principal;
use crate::store::CredentialStore;

/// Turns a bearer token into a [`Principal`].
///
/// Every failure (missing, bad signature, expired, revoked, account gone or
/// deactivated) is reported as [`AuthError::Unauthenticated`]. Store failures
/// are passed through so they map to 5xx rather than 401.
pub struct SessionVerifier {
    credentials: Arc<dyn CredentialStore>,
    revocations: Arc<RevocationList>,
    settings: AuthSettings,
}

impl SessionVerifier {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        revocations: Arc<RevocationList>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            credentials,
            revocations,
            settings,
        }
    }

    /// Token from an `Authorization: Bearer <token>` header value.
    pub fn bearer_token(header: Option<&str>) -> Option<&str> {
        let (scheme, token) = header?.trim().split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
    }

    pub async fn verify(&self, token: Option<&str>) -> Result<Principal, AuthError> {
        let token = token.ok_or(AuthError::Unauthenticated)?;
        let Some(claims) = verify_token(token, &self.settings.jwt_secret) else {
            debug!("token rejected: signature or expiry");
            return Err(AuthError::Unauthenticated);
        };
        if self.revocations.is_revoked(token) {
            debug!(id = %claims.id, "token rejected: revoked");
            return Err(AuthError::Unauthenticated);
        }
        let record = self
            .credentials
            .find_by_id(claims.role, &claims.id)
            .await?;
        match record {
            Some(record) if record.is_active() => Ok(Principal {
                id: claims.id,
                role: claims.role,
                active: true,
            }),
            Some(_) => {
                debug!(id = %claims.id, "token rejected: account deactivated");
                Err(AuthError::Unauthenticated)
            }
            None => {
                debug!(id = %claims.id, role = %claims.role, "token rejected: account missing");
                Err(AuthError::Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token;
    use crate::auth::{Authenticator, BcryptHasher, Registered};
    use crate::models::auth::{RegistrationInput, Role};
    use crate::store::{DocumentCredentials, MemoryStore};
    use chrono::Duration;

    const SECRET: &[u8] = b"session-test";

    struct Fixture {
        auth: Authenticator,
        verifier: SessionVerifier,
        credentials: Arc<dyn CredentialStore>,
    }

    fn fixture() -> Fixture {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(DocumentCredentials::new(Arc::new(MemoryStore::new())));
        let revocations = Arc::new(RevocationList::new());
        let settings = AuthSettings::new(SECRET, 30);
        Fixture {
            auth: Authenticator::new(
                Arc::clone(&credentials),
                Arc::new(BcryptHasher::new(4)),
                Arc::clone(&revocations),
                settings.clone(),
            ),
            verifier: SessionVerifier::new(Arc::clone(&credentials), revocations, settings),
            credentials,
        }
    }

    async fn customer_token(f: &Fixture) -> (String, String) {
        let input = RegistrationInput {
            role: Some("customer".into()),
            name: Some("Ann Lee".into()),
            email: Some("ann@x.com".into()),
            password: Some("password1".into()),
            phone_no: Some("0711234567".into()),
            ..Default::default()
        };
        match f.auth.register(&input).await.unwrap() {
            Registered::Session(s) => (s.token, s.profile.id),
            Registered::PendingApproval(_) => panic!("expected session"),
        }
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(SessionVerifier::bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(SessionVerifier::bearer_token(Some("bearer  abc ")), Some("abc"));
        assert_eq!(SessionVerifier::bearer_token(Some("Basic abc")), None);
        assert_eq!(SessionVerifier::bearer_token(Some("Bearer")), None);
        assert_eq!(SessionVerifier::bearer_token(Some("Bearer   ")), None);
        assert_eq!(SessionVerifier::bearer_token(None), None);
    }

    #[tokio::test]
    async fn valid_token_yields_principal() {
        let f = fixture();
        let (token, id) = customer_token(&f).await;
        let principal = f.verifier.verify(Some(&token)).await.unwrap();
        assert_eq!(principal.id, id);
        assert_eq!(principal.role, Role::Customer);
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated() {
        let f = fixture();
        assert!(matches!(
            f.verifier.verify(None).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let f = fixture();
        let (token, _) = customer_token(&f).await;
        f.auth.logout(Some(&token));
        assert!(matches!(
            f.verifier.verify(Some(&token)).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn deactivation_takes_effect_immediately() {
        let f = fixture();
        let (token, id) = customer_token(&f).await;
        f.credentials
            .set_active(Role::Customer, &id, false)
            .await
            .unwrap();
        assert!(matches!(
            f.verifier.verify(Some(&token)).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn token_for_missing_account_is_rejected() {
        let f = fixture();
        let (token, _) = issue_token(
            "aaaaaaaaaaaaaaaaaaaaaaaa",
            Role::Seller,
            SECRET,
            Duration::days(1),
        )
        .unwrap();
        assert!(matches!(
            f.verifier.verify(Some(&token)).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let f = fixture();
        let (_, id) = customer_token(&f).await;
        let (token, _) =
            issue_token(&id, Role::Customer, SECRET, Duration::seconds(-5)).unwrap();
        assert!(matches!(
            f.verifier.verify(Some(&token)).await,
            Err(AuthError::Unauthenticated)
        ));
    }
}
