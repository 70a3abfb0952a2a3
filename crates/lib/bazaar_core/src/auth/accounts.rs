//! Admin-side account management: approval decisions, activation, deletion.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::AuthError;
use crate::models::auth::{ApprovalStatus, CredentialRecord, Principal, Role};
use crate::store::{CredentialStore, StatusChange};

pub struct AccountAdmin {
    credentials: Arc<dyn CredentialStore>,
}

fn not_found(role: Role) -> AuthError {
    AuthError::NotFound(role.strategy().label.to_string())
}

impl AccountAdmin {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    async fn load(&self, role: Role, id: &str) -> Result<CredentialRecord, AuthError> {
        self.credentials
            .find_by_id(role, id)
            .await?
            .ok_or_else(|| not_found(role))
    }

    fn status_of(record: &CredentialRecord) -> Result<ApprovalStatus, AuthError> {
        record.approval().map(|a| a.status).ok_or_else(|| {
            AuthError::validation(format!(
                "{} accounts do not require approval",
                record.role().strategy().label
            ))
        })
    }

    pub async fn approve(
        &self,
        admin: &Principal,
        role: Role,
        id: &str,
    ) -> Result<CredentialRecord, AuthError> {
        let record = self.load(role, id).await?;
        if Self::status_of(&record)? == ApprovalStatus::Approved {
            return Err(AuthError::validation(format!(
                "{} is already approved",
                role.strategy().label
            )));
        }
        let change = StatusChange::Approve {
            by: admin.id.clone(),
            at: Utc::now(),
        };
        let updated = self
            .credentials
            .update_status(role, id, change)
            .await?
            .ok_or_else(|| not_found(role))?;
        info!(admin = %admin.id, %role, id, "account approved");
        Ok(updated)
    }

    pub async fn reject(
        &self,
        admin: &Principal,
        role: Role,
        id: &str,
        reason: Option<&str>,
    ) -> Result<CredentialRecord, AuthError> {
        let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
            return Err(AuthError::validation("Rejection reason is required"));
        };
        let record = self.load(role, id).await?;
        if Self::status_of(&record)? == ApprovalStatus::Rejected {
            return Err(AuthError::validation(format!(
                "{} is already rejected",
                role.strategy().label
            )));
        }
        let change = StatusChange::Reject {
            reason: reason.to_string(),
        };
        let updated = self
            .credentials
            .update_status(role, id, change)
            .await?
            .ok_or_else(|| not_found(role))?;
        info!(admin = %admin.id, %role, id, "account rejected");
        Ok(updated)
    }

    pub async fn set_active(
        &self,
        admin: &Principal,
        role: Role,
        id: &str,
        active: bool,
    ) -> Result<CredentialRecord, AuthError> {
        if !active && role == Role::Admin && id == admin.id {
            return Err(AuthError::validation("You cannot deactivate your own account"));
        }
        let updated = self
            .credentials
            .set_active(role, id, active)
            .await?
            .ok_or_else(|| not_found(role))?;
        info!(admin = %admin.id, %role, id, active, "account activation changed");
        Ok(updated)
    }

    pub async fn delete(&self, admin: &Principal, role: Role, id: &str) -> Result<(), AuthError> {
        if role == Role::Admin && id == admin.id {
            return Err(AuthError::validation("You cannot delete your own account"));
        }
        if !self.credentials.delete(role, id).await? {
            return Err(not_found(role));
        }
        info!(admin = %admin.id, %role, id, "account deleted");
        Ok(())
    }
}
