//! Deadline decorator for any [`DocumentStore`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::warn;

use super::{DocumentStore, Page, StoreError, UniqueGuard};
use crate::models::Document;
use crate::query::{Filter, QuerySpec};

/// Default deadline for a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Wraps a store so every call fails with [`StoreError::Timeout`] once its
/// deadline passes.
pub struct TimedStore {
    inner: Arc<dyn DocumentStore>,
    deadline: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    async fn run<T>(
        &self,
        operation: &'static str,
        collection: &str,
        fut: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, StoreError> {
        match timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, collection, deadline = ?self.deadline, "Store call timed out");
                Err(StoreError::Timeout {
                    operation,
                    elapsed: self.deadline,
                })
            }
        }
    }
}

#[async_trait]
impl DocumentStore for TimedStore {
    async fn find(&self, collection: &str, spec: &QuerySpec) -> Result<Page, StoreError> {
        self.run("find", collection, self.inner.find(collection, spec))
            .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        self.run("find_one", collection, self.inner.find_one(collection, filter))
            .await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.run("find_by_id", collection, self.inner.find_by_id(collection, id))
            .await
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        self.run("insert", collection, self.inner.insert(collection, doc))
            .await
    }

    async fn insert_unique(
        &self,
        collection: &str,
        doc: Document,
        guard: &UniqueGuard,
    ) -> Result<Document, StoreError> {
        self.run(
            "insert_unique",
            collection,
            self.inner.insert_unique(collection, doc, guard),
        )
        .await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.run("update", collection, self.inner.update(collection, id, patch))
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.run("delete", collection, self.inner.delete(collection, id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Never answers.
    struct Stalled;

    #[async_trait]
    impl DocumentStore for Stalled {
        async fn find(&self, _: &str, _: &QuerySpec) -> Result<Page, StoreError> {
            std::future::pending().await
        }
        async fn find_one(&self, _: &str, _: &Filter) -> Result<Option<Document>, StoreError> {
            std::future::pending().await
        }
        async fn find_by_id(&self, _: &str, _: &str) -> Result<Option<Document>, StoreError> {
            std::future::pending().await
        }
        async fn insert(&self, _: &str, _: Document) -> Result<Document, StoreError> {
            std::future::pending().await
        }
        async fn insert_unique(
            &self,
            _: &str,
            _: Document,
            _: &UniqueGuard,
        ) -> Result<Document, StoreError> {
            std::future::pending().await
        }
        async fn update(
            &self,
            _: &str,
            _: &str,
            _: Document,
        ) -> Result<Option<Document>, StoreError> {
            std::future::pending().await
        }
        async fn delete(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_times_out() {
        let store = TimedStore::new(Arc::new(Stalled), Duration::from_millis(250));
        let err = store.find_by_id("products", "x").await.unwrap_err();
        match err {
            StoreError::Timeout { operation, elapsed } => {
                assert_eq!(operation, "find_by_id");
                assert_eq!(elapsed, Duration::from_millis(250));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let store = TimedStore::new(Arc::new(MemoryStore::new()), DEFAULT_STORE_TIMEOUT);
        let saved = store.insert("products", Document::new()).await.unwrap();
        let id = saved["id"].as_str().unwrap();
        assert!(store.find_by_id("products", id).await.unwrap().is_some());
    }
}
