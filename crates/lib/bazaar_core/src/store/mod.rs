//! Storage abstraction.
//!
//! Entities and credential records live in named collections of JSON
//! documents. [`DocumentStore`] is the raw capability; [`CredentialStore`]
//! is the typed view over the four identity collections.

pub mod credentials;
pub mod memory;
pub mod postgres;
pub mod timeout;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use credentials::DocumentCredentials;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use timeout::TimedStore;

use crate::ids::{object_id, timestamp};
use crate::models::Document;
use crate::models::auth::{CredentialRecord, Role};
use crate::query::{Filter, QuerySpec};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store call '{operation}' timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("Unique constraint violated on '{field}'")]
    Conflict { field: String },

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Malformed document: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One page of a filtered collection plus the total match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Document>,
    pub total: u64,
}

/// Uniqueness guard for [`DocumentStore::insert_unique`]: no document in any
/// of `collections` may have `field` equal to `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueGuard {
    pub field: String,
    pub value: String,
    pub collections: Vec<String>,
}

/// Find/insert/update/delete over named collections of documents.
///
/// Inserted documents get an `id` (unless they carry one) and `createdAt`;
/// updates stamp `updatedAt`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Filter, sort and paginate a collection.
    async fn find(&self, collection: &str, spec: &QuerySpec) -> Result<Page, StoreError>;

    /// First matching document in creation order.
    async fn find_one(&self, collection: &str, filter: &Filter)
    -> Result<Option<Document>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str)
    -> Result<Option<Document>, StoreError>;

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError>;

    /// Atomically check `guard` and insert. Fails with [`StoreError::Conflict`]
    /// if the guarded value is already taken.
    async fn insert_unique(
        &self,
        collection: &str,
        doc: Document,
        guard: &UniqueGuard,
    ) -> Result<Document, StoreError>;

    /// Merge `patch` into the document. Returns the updated document, or
    /// `None` if it does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

/// Approval transition applied by an admin.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Approve {
        by: String,
        at: chrono::DateTime<chrono::Utc>,
    },
    Reject {
        reason: String,
    },
}

/// Typed access to the four identity collections.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<CredentialRecord>, StoreError>;

    async fn find_by_id(&self, role: Role, id: &str)
    -> Result<Option<CredentialRecord>, StoreError>;

    /// Persist a new record in one atomic step. Fails with
    /// [`StoreError::Conflict`] if the email exists in any collection.
    async fn create(&self, record: CredentialRecord) -> Result<CredentialRecord, StoreError>;

    async fn update_status(
        &self,
        role: Role,
        id: &str,
        change: StatusChange,
    ) -> Result<Option<CredentialRecord>, StoreError>;

    async fn set_active(
        &self,
        role: Role,
        id: &str,
        active: bool,
    ) -> Result<Option<CredentialRecord>, StoreError>;

    async fn delete(&self, role: Role, id: &str) -> Result<bool, StoreError>;
}

/// Build a patch document from field/value pairs.
pub fn patch<const N: usize>(fields: [(&str, Value); N]) -> Document {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Give a new document an `id` (unless it has one), `createdAt` and
/// `updatedAt`.
pub(crate) fn stamp_new(mut doc: Document) -> Document {
    let now = Value::from(timestamp(chrono::Utc::now()));
    if !doc.get("id").is_some_and(Value::is_string) {
        doc.insert("id".into(), Value::from(object_id()));
    }
    doc.entry("createdAt").or_insert_with(|| now.clone());
    doc.insert("updatedAt".into(), now);
    doc
}

/// Prepare an update patch: `id` is immutable and `updatedAt` is restamped.
pub(crate) fn stamp_patch(mut patch: Document) -> Document {
    patch.remove("id");
    patch.insert(
        "updatedAt".into(),
        Value::from(timestamp(chrono::Utc::now())),
    );
    patch
}
