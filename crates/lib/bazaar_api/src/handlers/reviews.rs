//! Review handlers.

use axum::Json;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use bazaar_core::auth::policy::ensure_owner;
use bazaar_core::ids::is_object_id;
use bazaar_core::models::auth::Role;
use bazaar_core::query::catalog::{ORDERS, PRODUCTS, REVIEWS};
use bazaar_core::query::{Predicate, build};
use serde_json::{Value, json};
use tracing::info;

use super::{AppJson, listing};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedUser, MaybeUser};
use crate::models::{ItemResponse, ListResponse, NewReview};

const MAX_COMMENT_LEN: usize = 1000;

/// `GET /reviews`: public. `my_reviews=true` from a signed-in customer
/// narrows the list to their own reviews.
pub async fn list_reviews_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    let params = listing::params(query.as_deref());
    let mut spec = build(&params, &REVIEWS, user.as_ref());
    if let Some(customer) = user.as_ref().filter(|u| u.role == Role::Customer)
        && params.get("my_reviews") == Some("true")
    {
        spec.restrict("customer_id", Predicate::Eq(Value::String(customer.id.clone())));
    }
    listing::page(&state, &REVIEWS, &spec).await
}

fn check_review(body: &NewReview) -> AppResult<(String, Option<String>, f64, String)> {
    let mut errors: Vec<String> = Vec::new();
    let product_id = body.product_id.as_deref().map(str::trim);
    match product_id {
        None | Some("") => errors.push("Product id is required".into()),
        Some(id) if !is_object_id(id) => errors.push("Invalid product id".into()),
        Some(_) => {}
    }
    let order_id = body
        .order_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    if order_id.is_some_and(|id| !is_object_id(id)) {
        errors.push("Invalid order id".into());
    }
    match body.rating {
        Some(r) if (1.0..=5.0).contains(&r) => {}
        Some(_) => errors.push("Rating must be between 1 and 5".into()),
        None => errors.push("Rating is required".into()),
    }
    let comment = body.comment.as_deref().unwrap_or_default().trim();
    if comment.chars().count() > MAX_COMMENT_LEN {
        errors.push(format!("Comment cannot exceed {MAX_COMMENT_LEN} characters"));
    }
    match (product_id, body.rating) {
        (Some(product_id), Some(rating)) if errors.is_empty() => Ok((
            product_id.to_string(),
            order_id.map(String::from),
            rating,
            comment.to_string(),
        )),
        _ => Err(AppError::Validation(errors)),
    }
}

/// `POST /reviews`: a customer reviews a product, optionally tied to one of
/// their own orders.
pub async fn create_review_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    AppJson(body): AppJson<NewReview>,
) -> AppResult<(StatusCode, Json<ItemResponse>)> {
    let (product_id, order_id, rating, comment) = check_review(&body)?;
    listing::fetch(&state, &PRODUCTS, &product_id).await?;
    if let Some(order_id) = &order_id {
        let order = listing::fetch(&state, &ORDERS, order_id).await?;
        ensure_owner(&user.0, &ORDERS, &order)?;
    }

    let review = listing::document(json!({
        "product_id": product_id,
        "order_id": order_id,
        "customer_id": user.0.id,
        "rating": rating,
        "comment": comment,
    }));
    let stored = state.store.insert(REVIEWS.collection, review).await?;
    info!(product = %product_id, customer = %user.0.id, "review posted");
    Ok((StatusCode::CREATED, Json(ItemResponse::new(stored))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: Option<f64>) -> NewReview {
        NewReview {
            product_id: Some("b".repeat(24)),
            order_id: None,
            rating,
            comment: Some("  lovely  ".into()),
        }
    }

    #[test]
    fn valid_review_is_trimmed() {
        let (product, order, rating, comment) = check_review(&review(Some(4.0))).unwrap();
        assert_eq!(product, "b".repeat(24));
        assert_eq!(order, None);
        assert_eq!(rating, 4.0);
        assert_eq!(comment, "lovely");
    }

    #[test]
    fn rating_bounds() {
        assert!(check_review(&review(Some(0.0))).is_err());
        assert!(check_review(&review(Some(6.0))).is_err());
        assert!(check_review(&review(None)).is_err());
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let body = NewReview {
            product_id: Some("nope".into()),
            order_id: Some("also-nope".into()),
            ..review(Some(3.0))
        };
        match check_review(&body) {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors, vec!["Invalid product id", "Invalid order id"])
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
