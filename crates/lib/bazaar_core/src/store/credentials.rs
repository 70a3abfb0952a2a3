//! [`CredentialStore`] over any [`DocumentStore`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{CredentialStore, DocumentStore, StatusChange, StoreError, UniqueGuard, patch};
use crate::ids::timestamp;
use crate::models::auth::{CredentialRecord, Role};
use crate::query::Filter;

/// Credential records stored as documents, one collection per role.
#[derive(Clone)]
pub struct DocumentCredentials {
    docs: Arc<dyn DocumentStore>,
}

impl DocumentCredentials {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    fn parse(
        role: Role,
        doc: Option<crate::models::Document>,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        doc.map(|d| CredentialRecord::from_document(role, d))
            .transpose()
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl CredentialStore for DocumentCredentials {
    async fn find_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let filter = Filter::matching("email", email);
        let doc = self.docs.find_one(role.collection(), &filter).await?;
        Self::parse(role, doc)
    }

    async fn find_by_id(
        &self,
        role: Role,
        id: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let doc = self.docs.find_by_id(role.collection(), id).await?;
        Self::parse(role, doc)
    }

    async fn create(&self, record: CredentialRecord) -> Result<CredentialRecord, StoreError> {
        let role = record.role();
        let guard = UniqueGuard {
            field: "email".to_string(),
            value: record.email().to_string(),
            collections: Role::collections().into_iter().map(String::from).collect(),
        };
        let doc = record.to_document()?;
        let stored = self
            .docs
            .insert_unique(role.collection(), doc, &guard)
            .await?;
        CredentialRecord::from_document(role, stored).map_err(StoreError::from)
    }

    async fn update_status(
        &self,
        role: Role,
        id: &str,
        change: StatusChange,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let fields = match change {
            StatusChange::Approve { by, at } => patch([
                ("status", Value::from("approved")),
                ("approvedBy", Value::from(by)),
                ("approvedAt", Value::from(timestamp(at))),
                ("rejectionReason", Value::Null),
            ]),
            StatusChange::Reject { reason } => patch([
                ("status", Value::from("rejected")),
                ("approvedBy", Value::Null),
                ("approvedAt", Value::Null),
                ("rejectionReason", Value::from(reason)),
            ]),
        };
        let doc = self.docs.update(role.collection(), id, fields).await?;
        Self::parse(role, doc)
    }

    async fn set_active(
        &self,
        role: Role,
        id: &str,
        active: bool,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let doc = self
            .docs
            .update(role.collection(), id, patch([("isActive", Value::Bool(active))]))
            .await?;
        Self::parse(role, doc)
    }

    async fn delete(&self, role: Role, id: &str) -> Result<bool, StoreError> {
        self.docs.delete(role.collection(), id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::{Account, Approval, ApprovalStatus, CustomerRecord, SellerRecord};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn account(id: &str, email: &str) -> Account {
        Account {
            id: id.to_string(),
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "h".to_string(),
            active: true,
            created_at: Utc::now(),
        }
    }

    fn seller(id: &str, email: &str) -> CredentialRecord {
        CredentialRecord::Seller(SellerRecord {
            account: account(id, email),
            shop_name: "Shop".into(),
            phone_no: "0711234567".into(),
            address: "Road 1".into(),
            approval: Approval::pending(),
        })
    }

    fn store() -> DocumentCredentials {
        DocumentCredentials::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_then_find_by_email_and_id() {
        let creds = store();
        creds.create(seller("aaaaaaaaaaaaaaaaaaaaaaaa", "s@x.io")).await.unwrap();

        let found = creds.find_by_email(Role::Seller, "s@x.io").await.unwrap();
        assert_eq!(found.unwrap().id(), "aaaaaaaaaaaaaaaaaaaaaaaa");
        assert!(creds.find_by_email(Role::Customer, "s@x.io").await.unwrap().is_none());
        assert!(
            creds
                .find_by_id(Role::Seller, "aaaaaaaaaaaaaaaaaaaaaaaa")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn create_rejects_email_taken_in_another_collection() {
        let creds = store();
        creds.create(seller("aaaaaaaaaaaaaaaaaaaaaaaa", "dup@x.io")).await.unwrap();
        let customer = CredentialRecord::Customer(CustomerRecord {
            account: account("bbbbbbbbbbbbbbbbbbbbbbbb", "dup@x.io"),
            phone_no: "0711234567".into(),
            address: String::new(),
        });
        let err = creds.create(customer).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref field } if field == "email"));
    }

    #[tokio::test]
    async fn approve_then_reject_round_trip() {
        let creds = store();
        creds.create(seller("aaaaaaaaaaaaaaaaaaaaaaaa", "s@x.io")).await.unwrap();

        let approved = creds
            .update_status(
                Role::Seller,
                "aaaaaaaaaaaaaaaaaaaaaaaa",
                StatusChange::Approve {
                    by: "admin-1".into(),
                    at: Utc::now(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(approved.is_approved());
        assert_eq!(
            approved.approval().unwrap().approved_by.as_deref(),
            Some("admin-1")
        );

        let rejected = creds
            .update_status(
                Role::Seller,
                "aaaaaaaaaaaaaaaaaaaaaaaa",
                StatusChange::Reject {
                    reason: "fake shop".into(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        let approval = rejected.approval().unwrap();
        assert_eq!(approval.status, ApprovalStatus::Rejected);
        assert_eq!(approval.rejection_reason.as_deref(), Some("fake shop"));
        assert_eq!(approval.approved_by, None);
        assert_eq!(approval.approved_at, None);

        let stored = creds
            .find_by_id(Role::Seller, "aaaaaaaaaaaaaaaaaaaaaaaa")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.approval().unwrap().approved_by.is_none());
    }

    #[tokio::test]
    async fn set_active_and_delete() {
        let creds = store();
        creds.create(seller("aaaaaaaaaaaaaaaaaaaaaaaa", "s@x.io")).await.unwrap();
        let off = creds
            .set_active(Role::Seller, "aaaaaaaaaaaaaaaaaaaaaaaa", false)
            .await
            .unwrap()
            .unwrap();
        assert!(!off.is_active());

        assert!(creds.delete(Role::Seller, "aaaaaaaaaaaaaaaaaaaaaaaa").await.unwrap());
        assert!(!creds.delete(Role::Seller, "aaaaaaaaaaaaaaaaaaaaaaaa").await.unwrap());
        assert!(
            creds
                .set_active(Role::Seller, "aaaaaaaaaaaaaaaaaaaaaaaa", true)
                .await
                .unwrap()
                .is_none()
        );
    }
}
