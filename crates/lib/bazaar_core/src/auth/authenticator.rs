//! Registration, login, logout and profile lookup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use tracing::{info, warn};

use super::jwt::{issue_token, verify_token};
use super::password::PasswordHasher;
use super::revocation::RevocationList;
use super::validation::{NewRegistration, normalize_email, validate_login, validate_registration};
use super::{AuthError, AuthSettings};
use crate::ids::object_id;
use crate::models::auth::{
    Account, AdminRecord, Approval, CredentialRecord, CustomerRecord, DelivererRecord,
    LoginInput, Principal, PublicProfile, RegistrationInput, Role, SellerRecord,
};
use crate::store::{CredentialStore, StoreError};

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub profile: PublicProfile,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone)]
pub enum Registered {
    /// Customer accounts are usable immediately.
    Session(Session),
    /// Seller and deliverer accounts wait for an admin.
    PendingApproval(PublicProfile),
}

pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    revocations: Arc<RevocationList>,
    settings: AuthSettings,
}

fn conflict_on_duplicate(err: StoreError) -> AuthError {
    match err {
        StoreError::Conflict { .. } => AuthError::Conflict,
        other => AuthError::Store(other),
    }
}

impl Authenticator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        revocations: Arc<RevocationList>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            credentials,
            hasher,
            revocations,
            settings,
        }
    }

    /// True if any identity collection holds `email`. The four lookups run
    /// concurrently.
    pub async fn email_taken(&self, email: &str) -> Result<bool, AuthError> {
        let lookups = Role::ALL
            .iter()
            .map(|role| self.credentials.find_by_email(*role, email));
        let found = try_join_all(lookups).await?;
        Ok(found.iter().any(Option::is_some))
    }

    pub async fn register(&self, input: &RegistrationInput) -> Result<Registered, AuthError> {
        let reg = validate_registration(input)?;
        if self.email_taken(&reg.email).await? {
            info!(role = %reg.role, email = %reg.email, "registration rejected: email taken");
            return Err(AuthError::Conflict);
        }

        let password_hash = self.hasher.hash(&reg.password)?;
        let record = new_record(&reg, password_hash);
        // The store re-checks uniqueness atomically; a concurrent registration
        // that slipped past the check above surfaces here.
        let stored = self
            .credentials
            .create(record)
            .await
            .map_err(conflict_on_duplicate)?;
        info!(role = %reg.role, email = %reg.email, id = stored.id(), "registered");

        if reg.role.requires_approval() {
            Ok(Registered::PendingApproval(stored.profile()))
        } else {
            Ok(Registered::Session(self.issue(&stored)?))
        }
    }

    pub async fn login(&self, input: &LoginInput) -> Result<Session, AuthError> {
        let req = validate_login(input)?;
        let record = match req.role {
            Some(role) => self.credentials.find_by_email(role, &req.email).await?,
            None => self.probe(&req.email).await?,
        };
        let Some(record) = record else {
            info!(email = %req.email, "login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .hasher
            .verify(&req.password, &record.account().password_hash)?
        {
            info!(email = %req.email, role = %record.role(), "login failed: bad password");
            return Err(AuthError::InvalidCredentials);
        }
        if !record.is_active() {
            info!(email = %req.email, role = %record.role(), "login refused: deactivated");
            return Err(AuthError::Deactivated);
        }
        if !record.is_approved() {
            info!(email = %req.email, role = %record.role(), "login refused: not approved");
            return Err(AuthError::PendingApproval(record.role()));
        }

        let session = self.issue(&record)?;
        info!(id = record.id(), role = %record.role(), "logged in");
        Ok(session)
    }

    /// First record holding `email`, probing roles in [`Role::ALL`] order.
    async fn probe(&self, email: &str) -> Result<Option<CredentialRecord>, AuthError> {
        for role in Role::ALL {
            if let Some(record) = self.credentials.find_by_email(role, email).await? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Revoke `token`. Always succeeds; tokens that do not verify are ignored.
    pub fn logout(&self, token: Option<&str>) {
        let Some(token) = token else {
            return;
        };
        if let Some(claims) = verify_token(token, &self.settings.jwt_secret) {
            self.revocations.revoke(token, claims.exp);
            info!(id = %claims.id, role = %claims.role, "logged out");
        }
    }

    /// Current profile of an authenticated principal, read fresh.
    pub async fn profile(&self, principal: &Principal) -> Result<PublicProfile, AuthError> {
        self.credentials
            .find_by_id(principal.role, &principal.id)
            .await?
            .map(|record| record.profile())
            .ok_or_else(|| AuthError::NotFound("User".to_string()))
    }

    /// Create the admin account if no account holds `email`. Returns whether
    /// an account was created.
    pub async fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<bool, AuthError> {
        let email = normalize_email(email);
        if let Some(existing) = self.credentials.find_by_email(Role::Admin, &email).await? {
            info!(id = existing.id(), "admin account present");
            return Ok(false);
        }
        if self.email_taken(&email).await? {
            warn!(email = %email, "admin seed email belongs to another role");
            return Err(AuthError::Conflict);
        }
        if password.chars().count() < 8 {
            return Err(AuthError::validation(
                "Admin password must be at least 8 characters long",
            ));
        }

        let record = CredentialRecord::Admin(AdminRecord {
            account: Account {
                id: object_id(),
                name: name.trim().to_string(),
                email: email.clone(),
                password_hash: self.hasher.hash(password)?,
                active: true,
                created_at: Utc::now(),
            },
        });
        let stored = self
            .credentials
            .create(record)
            .await
            .map_err(conflict_on_duplicate)?;
        info!(id = stored.id(), email = %email, "seeded admin account");
        Ok(true)
    }

    fn issue(&self, record: &CredentialRecord) -> Result<Session, AuthError> {
        let (token, claims) = issue_token(
            record.id(),
            record.role(),
            &self.settings.jwt_secret,
            self.settings.token_ttl,
        )?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::Token("expiry out of range".to_string()))?;
        Ok(Session {
            token,
            expires_at,
            profile: record.profile(),
        })
    }
}

fn new_record(reg: &NewRegistration, password_hash: String) -> CredentialRecord {
    let account = Account {
        id: object_id(),
        name: reg.name.clone(),
        email: reg.email.clone(),
        password_hash,
        active: true,
        created_at: Utc::now(),
    };
    match reg.role {
        Role::Admin => CredentialRecord::Admin(AdminRecord { account }),
        Role::Customer => CredentialRecord::Customer(CustomerRecord {
            account,
            phone_no: reg.phone_no.clone(),
            address: reg.address.clone(),
        }),
        Role::Seller => CredentialRecord::Seller(SellerRecord {
            account,
            shop_name: reg.shop_name.clone(),
            phone_no: reg.phone_no.clone(),
            address: reg.address.clone(),
            approval: Approval::pending(),
        }),
        Role::Deliverer => CredentialRecord::Deliverer(DelivererRecord {
            account,
            phone_no: reg.phone_no.clone(),
            address: reg.address.clone(),
            vehicle_no: reg.vehicle_no.clone(),
            vehicle_type: reg.vehicle_type.clone(),
            approval: Approval::pending(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BcryptHasher;
    use crate::auth::jwt::verify_token;
    use crate::models::auth::ApprovalStatus;
    use crate::store::{DocumentCredentials, MemoryStore, StatusChange};

    const SECRET: &[u8] = b"authenticator-test";

    fn fixture() -> (Authenticator, Arc<dyn CredentialStore>, Arc<RevocationList>) {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(DocumentCredentials::new(Arc::new(MemoryStore::new())));
        let revocations = Arc::new(RevocationList::new());
        let auth = Authenticator::new(
            Arc::clone(&credentials),
            Arc::new(BcryptHasher::new(4)),
            Arc::clone(&revocations),
            AuthSettings::new(SECRET, 30),
        );
        (auth, credentials, revocations)
    }

    fn ann() -> RegistrationInput {
        RegistrationInput {
            role: Some("customer".into()),
            name: Some("Ann Lee".into()),
            email: Some("ann@x.com".into()),
            password: Some("password1".into()),
            phone_no: Some("0711234567".into()),
            ..Default::default()
        }
    }

    fn seller(email: &str) -> RegistrationInput {
        RegistrationInput {
            role: Some("seller".into()),
            name: Some("Sam Shop".into()),
            email: Some(email.into()),
            password: Some("password1".into()),
            phone_no: Some("0711234567".into()),
            shop_name: Some("Sam's".into()),
            address: Some("1 Market St".into()),
            ..Default::default()
        }
    }

    fn login(email: &str, password: &str, role: Option<&str>) -> LoginInput {
        LoginInput {
            email: Some(email.into()),
            password: Some(password.into()),
            role: role.map(String::from),
        }
    }

    #[tokio::test]
    async fn customer_registration_issues_session() {
        let (auth, _, _) = fixture();
        let Registered::Session(session) = auth.register(&ann()).await.unwrap() else {
            panic!("customer should get a session");
        };
        let claims = verify_token(&session.token, SECRET).unwrap();
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.id, session.profile.id);
        assert_eq!(session.profile.phone_no.as_deref(), Some("0711234567"));
    }

    #[tokio::test]
    async fn email_is_unique_across_roles() {
        let (auth, _, _) = fixture();
        auth.register(&ann()).await.unwrap();
        let err = auth.register(&seller(" ANN@x.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict));
    }

    #[tokio::test]
    async fn seller_is_pending_until_approved() {
        let (auth, credentials, _) = fixture();
        let Registered::PendingApproval(profile) =
            auth.register(&seller("sam@x.com")).await.unwrap()
        else {
            panic!("seller should be pending");
        };
        assert_eq!(profile.status, Some(ApprovalStatus::Pending));

        let err = auth
            .login(&login("sam@x.com", "password1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PendingApproval(Role::Seller)));

        credentials
            .update_status(
                Role::Seller,
                &profile.id,
                StatusChange::Approve {
                    by: "admin".into(),
                    at: Utc::now(),
                },
            )
            .await
            .unwrap();
        let session = auth
            .login(&login("sam@x.com", "password1", Some("seller")))
            .await
            .unwrap();
        assert_eq!(session.profile.status, Some(ApprovalStatus::Approved));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (auth, _, _) = fixture();
        auth.register(&ann()).await.unwrap();
        let a = auth
            .login(&login("ann@x.com", "wrong-pass", None))
            .await
            .unwrap_err();
        let b = auth
            .login(&login("nobody@x.com", "password1", None))
            .await
            .unwrap_err();
        assert_eq!(a.to_string(), b.to_string());
        assert!(matches!(a, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn role_restricts_lookup() {
        let (auth, _, _) = fixture();
        auth.register(&ann()).await.unwrap();
        let err = auth
            .login(&login("ann@x.com", "password1", Some("seller")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let (auth, credentials, _) = fixture();
        let Registered::Session(session) = auth.register(&ann()).await.unwrap() else {
            panic!("expected session");
        };
        credentials
            .set_active(Role::Customer, &session.profile.id, false)
            .await
            .unwrap();
        let err = auth
            .login(&login("ann@x.com", "password1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Deactivated));
    }

    #[tokio::test]
    async fn logout_revokes_only_valid_tokens() {
        let (auth, _, revocations) = fixture();
        let Registered::Session(session) = auth.register(&ann()).await.unwrap() else {
            panic!("expected session");
        };
        auth.logout(Some("garbage"));
        auth.logout(None);
        assert!(revocations.is_empty());

        auth.logout(Some(&session.token));
        auth.logout(Some(&session.token));
        assert!(revocations.is_revoked(&session.token));
        assert_eq!(revocations.len(), 1);
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let (auth, _, _) = fixture();
        assert!(auth.ensure_admin("Root", "Root@x.com", "admin-pass").await.unwrap());
        assert!(!auth.ensure_admin("Root", "root@x.com", "admin-pass").await.unwrap());
        let session = auth
            .login(&login("root@x.com", "admin-pass", None))
            .await
            .unwrap();
        assert_eq!(session.profile.role, Role::Admin);
        assert_eq!(session.profile.is_active, Some(true));
    }

    #[tokio::test]
    async fn profile_reads_current_state() {
        let (auth, credentials, _) = fixture();
        let Registered::Session(session) = auth.register(&ann()).await.unwrap() else {
            panic!("expected session");
        };
        let principal = Principal {
            id: session.profile.id.clone(),
            role: Role::Customer,
            active: true,
        };
        assert_eq!(auth.profile(&principal).await.unwrap().email, "ann@x.com");

        credentials
            .delete(Role::Customer, &principal.id)
            .await
            .unwrap();
        assert!(matches!(
            auth.profile(&principal).await,
            Err(AuthError::NotFound(_))
        ));
    }
}
