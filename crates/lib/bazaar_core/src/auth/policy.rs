//! Route gates and ownership rules.

use std::sync::Arc;

use tracing::debug;

use super::AuthError;
use crate::models::Document;
use crate::models::auth::{Principal, Role};
use crate::query::ResourceSpec;
use crate::query::matcher::matches;
use crate::query::Filter;
use crate::store::CredentialStore;

/// Capability a route requires of its principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Any authenticated principal.
    Authenticated,
    /// Principal's role is in the set.
    Roles(&'static [Role]),
    /// Principal has `role` and its account is approved and active, read
    /// fresh from the store.
    Approved(Role),
    /// Admin, or principal has `role`.
    AdminOr(Role),
    /// Admin, or [`Gate::Approved`] for `role`.
    AdminOrApproved(Role),
}

/// Evaluates [`Gate`]s. Admin short-circuits every `AdminOr*` gate before any
/// store lookup.
#[derive(Clone)]
pub struct AccessPolicy {
    credentials: Arc<dyn CredentialStore>,
}

fn forbidden(message: impl Into<String>) -> AuthError {
    AuthError::Forbidden(message.into())
}

impl AccessPolicy {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    pub async fn check(&self, principal: &Principal, gate: Gate) -> Result<(), AuthError> {
        let result = match gate {
            Gate::Authenticated => Ok(()),
            Gate::Roles(allowed) => require_role(principal, allowed),
            Gate::Approved(role) => self.require_approved(principal, role).await,
            Gate::AdminOr(_) | Gate::AdminOrApproved(_) if principal.is_admin() => Ok(()),
            Gate::AdminOr(role) if principal.role == role => Ok(()),
            Gate::AdminOr(role) => Err(forbidden(format!(
                "Access denied. Required role: {role} or admin"
            ))),
            Gate::AdminOrApproved(role) if principal.role == role => {
                self.require_approved(principal, role).await
            }
            Gate::AdminOrApproved(role) => Err(forbidden(format!(
                "Access denied. Admin or approved {role} access required"
            ))),
        };
        if let Err(err) = &result {
            debug!(id = %principal.id, role = %principal.role, ?gate, %err, "gate denied");
        }
        result
    }

    async fn require_approved(&self, principal: &Principal, role: Role) -> Result<(), AuthError> {
        let label = role.strategy().label;
        if principal.role != role {
            return Err(forbidden(format!("{label} access required")));
        }
        let record = self
            .credentials
            .find_by_id(role, &principal.id)
            .await?
            .ok_or_else(|| AuthError::NotFound(label.to_string()))?;
        if !record.is_approved() {
            return Err(forbidden(format!(
                "Your {role} account is pending approval. Please wait for admin approval."
            )));
        }
        if !record.is_active() {
            return Err(forbidden(format!("Your {role} account is deactivated")));
        }
        Ok(())
    }
}

pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(forbidden(format!(
            "User role '{}' is not authorized to access this route",
            principal.role
        )))
    }
}

/// Non-admins may only mutate documents whose owner field is their own id.
pub fn ensure_owner(
    principal: &Principal,
    resource: &ResourceSpec,
    doc: &Document,
) -> Result<(), AuthError> {
    if principal.is_admin() {
        return Ok(());
    }
    let owned = resource
        .owner_field
        .and_then(|field| doc.get(field))
        .and_then(|v| v.as_str())
        .is_some_and(|owner| owner == principal.id);
    if owned {
        Ok(())
    } else {
        Err(forbidden(format!(
            "Not authorized to modify this {}",
            resource.singular()
        )))
    }
}

/// Non-admins may only read single documents that their role scope on
/// `resource` would have listed. Roles without a scope see everything.
pub fn ensure_visible(
    principal: &Principal,
    resource: &ResourceSpec,
    doc: &Document,
) -> Result<(), AuthError> {
    if principal.is_admin() {
        return Ok(());
    }
    let Some(rule) = resource.scope_for(principal.role) else {
        return Ok(());
    };
    let (field, predicate) = rule.pin(principal);
    let mut scope = Filter::new();
    scope.scope(field, predicate);
    if matches(doc, &scope) {
        Ok(())
    } else {
        Err(forbidden(format!(
            "Not authorized to access this {}",
            resource.singular()
        )))
    }
}
