//! Product catalogue handlers.
//!
//! Browsing is public. Creating requires an admin or an approved seller;
//! updating and deleting additionally require owning the product.

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use bazaar_core::auth::policy::ensure_owner;
use bazaar_core::ids::is_object_id;
use bazaar_core::models::Document;
use bazaar_core::models::auth::Role;
use bazaar_core::query::catalog::PRODUCTS;
use serde_json::{Value, json};
use tracing::info;

use super::{AppJson, listing};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedUser, MaybeUser};
use crate::models::{ItemResponse, ListResponse, MessageResponse, NewProduct, ProductFields};

const MAX_IMAGES: usize = 5;

fn categories(value: &Value) -> Result<Vec<String>, String> {
    let invalid = || "Category must be a string or a list of strings".to_string();
    match value {
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(|s| s.trim().to_string()).ok_or_else(invalid))
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(invalid()),
    }
}

/// Validate `fields` into a document. With `creating`, required fields must be
/// present and absent optional ones get their defaults.
fn product_document(fields: &ProductFields, creating: bool) -> AppResult<Document> {
    let mut errors: Vec<String> = Vec::new();
    let mut doc = Document::new();

    match fields.name.as_deref().map(str::trim) {
        Some("") => errors.push("Product name cannot be empty".into()),
        Some(name) => {
            doc.insert("name".into(), name.into());
        }
        None if creating => errors.push("Product name is required".into()),
        None => {}
    }
    match fields.price {
        Some(price) if price.is_finite() && price >= 0.0 => {
            doc.insert("price".into(), json!(price));
        }
        Some(_) => errors.push("Price must be a non-negative number".into()),
        None if creating => errors.push("Price is required".into()),
        None => {}
    }
    match fields.discount {
        Some(discount) if (0.0..=100.0).contains(&discount) => {
            doc.insert("discount".into(), json!(discount));
        }
        Some(_) => errors.push("Discount must be between 0 and 100".into()),
        None if creating => {
            doc.insert("discount".into(), json!(0));
        }
        None => {}
    }
    match &fields.images {
        Some(images) if images.len() > MAX_IMAGES => {
            errors.push(format!("Maximum {MAX_IMAGES} images allowed per product"))
        }
        Some(images) => {
            doc.insert("images".into(), json!(images));
        }
        None if creating => {
            doc.insert("images".into(), json!([]));
        }
        None => {}
    }
    match fields.category.as_ref().map(categories) {
        Some(Ok(list)) => {
            doc.insert("category".into(), json!(list));
        }
        Some(Err(message)) => errors.push(message),
        None if creating => {
            doc.insert("category".into(), json!([]));
        }
        None => {}
    }
    if let Some(description) = &fields.description {
        doc.insert("description".into(), description.trim().into());
    } else if creating {
        doc.insert("description".into(), "".into());
    }
    if let Some(instock) = fields.instock {
        doc.insert("instock".into(), instock.into());
    } else if creating {
        doc.insert("instock".into(), true.into());
    }

    if errors.is_empty() {
        Ok(doc)
    } else {
        Err(AppError::Validation(errors))
    }
}

/// `GET /products`: public listing. A signed-in seller sees only their own.
pub async fn list_products_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    listing::list(&state, &PRODUCTS, query.as_deref(), user.as_ref()).await
}

/// `GET /products/{id}`
pub async fn get_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ItemResponse>> {
    let doc = listing::fetch(&state, &PRODUCTS, &id).await?;
    Ok(Json(ItemResponse::new(listing::present(&PRODUCTS, doc))))
}

/// `POST /products`: sellers create products they own; admins may name the
/// owning seller.
pub async fn create_product_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    AppJson(body): AppJson<NewProduct>,
) -> AppResult<(StatusCode, Json<ItemResponse>)> {
    let principal = &user.0;
    let seller_id = if principal.is_admin() {
        match body.seller_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) if !is_object_id(id) => {
                return Err(AppError::validation("Invalid seller id"));
            }
            Some(id) => {
                state
                    .credentials
                    .find_by_id(Role::Seller, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Seller not found".into()))?;
                Some(id.to_string())
            }
            None => None,
        }
    } else {
        Some(principal.id.clone())
    };

    let mut doc = product_document(&body.fields, true)?;
    if let Some(seller_id) = seller_id {
        doc.insert("seller_id".into(), seller_id.into());
    }
    let stored = state.store.insert(PRODUCTS.collection, doc).await?;
    let id = stored.get("id").and_then(Value::as_str);
    info!(id, by = %principal.id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(ItemResponse::new(listing::present(&PRODUCTS, stored))),
    ))
}

/// `PUT /products/{id}`: owner seller or admin.
pub async fn update_product_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(body): AppJson<ProductFields>,
) -> AppResult<Json<ItemResponse>> {
    let existing = listing::fetch(&state, &PRODUCTS, &id).await?;
    ensure_owner(&user.0, &PRODUCTS, &existing)?;

    let patch = product_document(&body, false)?;
    if patch.is_empty() {
        return Err(AppError::validation("No product fields to update"));
    }
    let updated = state
        .store
        .update(PRODUCTS.collection, &id, patch)
        .await?
        .ok_or_else(|| listing::not_found(&PRODUCTS))?;
    info!(id = %id, by = %user.0.id, "product updated");
    Ok(Json(ItemResponse::new(listing::present(&PRODUCTS, updated))))
}

/// `DELETE /products/{id}`: owner seller or admin.
pub async fn delete_product_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let existing = listing::fetch(&state, &PRODUCTS, &id).await?;
    ensure_owner(&user.0, &PRODUCTS, &existing)?;
    if !state.store.delete(PRODUCTS.collection, &id).await? {
        return Err(listing::not_found(&PRODUCTS));
    }
    info!(id = %id, by = %user.0.id, "product deleted");
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_optional_fields() {
        let fields = ProductFields {
            name: Some("  Tea  ".into()),
            price: Some(4.5),
            ..Default::default()
        };
        let doc = product_document(&fields, true).unwrap();
        assert_eq!(doc["name"], "Tea");
        assert_eq!(doc["discount"], json!(0));
        assert_eq!(doc["instock"], json!(true));
        assert_eq!(doc["category"], json!([]));
    }

    #[test]
    fn create_collects_every_violation() {
        let fields = ProductFields {
            discount: Some(150.0),
            images: Some(vec!["a".into(); 6]),
            ..Default::default()
        };
        match product_document(&fields, true) {
            Err(AppError::Validation(errors)) => assert_eq!(
                errors,
                vec![
                    "Product name is required",
                    "Price is required",
                    "Discount must be between 0 and 100",
                    "Maximum 5 images allowed per product",
                ]
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn update_only_touches_supplied_fields() {
        let fields = ProductFields {
            price: Some(9.0),
            ..Default::default()
        };
        let doc = product_document(&fields, false).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc["price"], json!(9.0));
    }

    #[test]
    fn category_accepts_string_or_list() {
        assert_eq!(
            categories(&json!("tea, coffee")).unwrap(),
            vec!["tea", "coffee"]
        );
        assert_eq!(categories(&json!(["tea"])).unwrap(), vec!["tea"]);
        assert!(categories(&json!(7)).is_err());
        assert!(categories(&json!([1])).is_err());
    }
}
