//! In-process document store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, Page, StoreError, UniqueGuard, stamp_new, stamp_patch};
use crate::models::Document;
use crate::query::matcher::{compare, matches};
use crate::query::{Filter, QuerySpec};

/// Collections held in memory. Documents within a collection keep insertion
/// order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_id(doc: &Document, id: &str) -> bool {
    doc.get("id").and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, spec: &QuerySpec) -> Result<Page, StoreError> {
        let guard = self.collections.read().await;
        let Some(docs) = guard.get(collection) else {
            return Ok(Page::default());
        };
        let mut hits: Vec<&Document> = docs.iter().filter(|d| matches(d, &spec.filter)).collect();
        hits.sort_by(|a, b| compare(a, b, &spec.sort));
        let total = hits.len() as u64;
        let items = hits
            .into_iter()
            .skip(usize::try_from(spec.pagination.skip).unwrap_or(usize::MAX))
            .take(usize::try_from(spec.pagination.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(Page { items, total })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, filter)))
            .cloned())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| has_id(d, id)))
            .cloned())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = stamp_new(doc);
        let mut guard = self.collections.write().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        doc: Document,
        unique: &UniqueGuard,
    ) -> Result<Document, StoreError> {
        let mut guard = self.collections.write().await;
        let taken = unique.collections.iter().any(|name| {
            guard.get(name).is_some_and(|docs| {
                docs.iter().any(|d| {
                    d.get(&unique.field).and_then(Value::as_str) == Some(unique.value.as_str())
                })
            })
        });
        if taken {
            return Err(StoreError::Conflict {
                field: unique.field.clone(),
            });
        }
        let doc = stamp_new(doc);
        guard
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(doc) = guard
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| has_id(d, id)))
        else {
            return Ok(None);
        };
        doc.extend(stamp_patch(patch));
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| !has_id(d, id));
        Ok(docs.len() != before)
    }
}
