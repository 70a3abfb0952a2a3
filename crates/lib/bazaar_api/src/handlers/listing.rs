//! Shared plumbing for list and fetch-one endpoints.

use axum::Json;
use bazaar_core::models::Document;
use bazaar_core::models::auth::Principal;
use bazaar_core::query::{PageMeta, QueryParams, QuerySpec, ResourceSpec, build};
use tracing::debug;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::ListResponse;

/// Parse the raw query string of a request.
pub fn params(raw: Option<&str>) -> QueryParams {
    QueryParams::parse(raw.unwrap_or_default())
}

/// Run `spec` against `resource` and wrap the page with its metadata.
pub async fn page(
    state: &AppState,
    resource: &ResourceSpec,
    spec: &QuerySpec,
) -> AppResult<Json<ListResponse>> {
    let page = state.store.find(resource.collection, spec).await?;
    debug!(
        resource = resource.name,
        total = page.total,
        page = spec.pagination.page,
        "listed"
    );
    let items = page
        .items
        .into_iter()
        .map(|doc| present(resource, doc))
        .collect();
    Ok(Json(ListResponse {
        success: true,
        meta: PageMeta::new(page.total, &spec.pagination),
        items,
    }))
}

/// Build the query for `principal` and run it.
pub async fn list(
    state: &AppState,
    resource: &ResourceSpec,
    raw_query: Option<&str>,
    principal: Option<&Principal>,
) -> AppResult<Json<ListResponse>> {
    let spec = build(&params(raw_query), resource, principal);
    page(state, resource, &spec).await
}

/// Load one document or fail with `404 "<Entity> not found"`.
pub async fn fetch(state: &AppState, resource: &ResourceSpec, id: &str) -> AppResult<Document> {
    state
        .store
        .find_by_id(resource.collection, id)
        .await?
        .ok_or_else(|| not_found(resource))
}

pub fn not_found(resource: &ResourceSpec) -> AppError {
    let noun = resource.singular();
    let mut chars = noun.chars();
    let label = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    AppError::NotFound(format!("{label} not found"))
}

/// Unwrap a JSON object literal into a document.
pub fn document(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Strip hidden fields before a document leaves the service.
pub fn present(resource: &ResourceSpec, mut doc: Document) -> Document {
    resource.redact(&mut doc);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::query::catalog::{CUSTOMERS, DELIVERIES, PRODUCTS};
    use serde_json::json;

    #[test]
    fn not_found_uses_singular_label() {
        assert_eq!(not_found(&PRODUCTS).to_string(), "Product not found");
        assert_eq!(not_found(&DELIVERIES).to_string(), "Delivery not found");
    }

    #[test]
    fn present_redacts_password_hash() {
        let doc = document(json!({"id": "c1", "passwordHash": "$2b$..", "name": "Ann"}));
        let shown = present(&CUSTOMERS, doc);
        assert!(!shown.contains_key("passwordHash"));
        assert_eq!(shown["name"], "Ann");
    }

    #[test]
    fn missing_query_string_is_empty_params() {
        assert!(!params(None).contains("page"));
        assert_eq!(params(Some("page=2")).get("page"), Some("2"));
    }
}
