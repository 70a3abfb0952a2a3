//! Order handlers.
//!
//! Customers see their own orders, sellers see orders containing one of
//! their products, admins see everything.

use std::collections::BTreeSet;

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use bazaar_core::auth::policy::ensure_visible;
use bazaar_core::ids::{is_object_id, timestamp};
use bazaar_core::models::auth::Principal;
use bazaar_core::query::catalog::{ORDERS, PAYMENTS, PRODUCTS};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;

use super::{AppJson, listing};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ItemResponse, ListResponse, NewOrder};

const PAYMENT_METHODS: &[&str] = &["cod", "online"];

/// `GET /orders`
pub async fn list_orders_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    listing::list(&state, &ORDERS, query.as_deref(), Some(&user.0)).await
}

/// `GET /orders/{id}`: 403 unless the order falls in the caller's scope.
pub async fn get_order_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ItemResponse>> {
    let doc = listing::fetch(&state, &ORDERS, &id).await?;
    ensure_visible(&user.0, &ORDERS, &doc)?;
    Ok(Json(ItemResponse::new(doc)))
}

fn check_order(body: &NewOrder) -> AppResult<(String, &'static str)> {
    let mut errors: Vec<String> = Vec::new();
    if body.items.is_empty() {
        errors.push("Order must contain at least one item".into());
    }
    for line in &body.items {
        if !is_object_id(&line.product_id) {
            errors.push(format!("Invalid product id '{}'", line.product_id));
        }
        if line.quantity == 0 {
            errors.push("Quantity must be at least 1".into());
        }
    }
    let address = body
        .shipping_address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());
    if address.is_none() {
        errors.push("Shipping address is required".into());
    }
    let method = match body.payment_method.as_deref().map(str::trim) {
        None | Some("") => Some("cod"),
        Some(m) => PAYMENT_METHODS.iter().copied().find(|known| *known == m),
    };
    if method.is_none() {
        errors.push("Payment method must be one of: cod, online".into());
    }
    match (address, method) {
        (Some(address), Some(method)) if errors.is_empty() => Ok((address.to_string(), method)),
        _ => Err(AppError::Validation(errors)),
    }
}

/// Unit price after the product's percentage discount.
fn unit_price(product: &serde_json::Map<String, Value>) -> f64 {
    let price = product.get("price").and_then(Value::as_f64).unwrap_or(0.0);
    let discount = product
        .get("discount")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);
    price * (100.0 - discount) / 100.0
}

/// `POST /orders`: place an order as the signed-in customer.
///
/// Prices are captured at order time. The order records every seller whose
/// product it contains so sellers can be scoped to their orders. A pending
/// payment is opened alongside.
pub async fn create_order_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    AppJson(body): AppJson<NewOrder>,
) -> AppResult<(StatusCode, Json<ItemResponse>)> {
    let customer: &Principal = &user.0;
    let (address, method) = check_order(&body)?;

    let mut lines = Vec::with_capacity(body.items.len());
    let mut seller_ids = BTreeSet::new();
    let mut total = 0.0;
    for line in &body.items {
        let product = state
            .store
            .find_by_id(PRODUCTS.collection, &line.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", line.product_id)))?;
        if product.get("instock").and_then(Value::as_bool) == Some(false) {
            return Err(AppError::validation(format!(
                "Product {} is out of stock",
                line.product_id
            )));
        }
        let price = unit_price(&product);
        total += price * f64::from(line.quantity);
        if let Some(seller) = product.get("seller_id").and_then(Value::as_str) {
            seller_ids.insert(seller.to_string());
        }
        lines.push(json!({
            "product": line.product_id,
            "quantity": line.quantity,
            "price": price,
        }));
    }

    let order = listing::document(json!({
        "customer_id": customer.id,
        "items": lines,
        "seller_ids": seller_ids,
        "total_amount": total,
        "shippingAddress": address,
        "paymentMethod": method,
        "status": "pending",
        "order_date": timestamp(Utc::now()),
    }));
    let order = state.store.insert(ORDERS.collection, order).await?;
    let order_id = order
        .get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| AppError::Internal("stored order has no id".into()))?;

    let payment_method = match method {
        "cod" => "cash on delivery",
        other => other,
    };
    let payment = listing::document(json!({
        "customer_id": customer.id,
        "order_id": order_id,
        "payment_method": payment_method,
        "amount": total,
        "status": "pending",
    }));
    state.store.insert(PAYMENTS.collection, payment).await?;

    info!(id = %order_id, customer = %customer.id, total, "order placed");
    Ok((StatusCode::CREATED, Json(ItemResponse::new(order))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderLine;

    fn order(items: Vec<OrderLine>, address: Option<&str>, method: Option<&str>) -> NewOrder {
        NewOrder {
            items,
            shipping_address: address.map(String::from),
            payment_method: method.map(String::from),
        }
    }

    #[test]
    fn payment_method_defaults_to_cod() {
        let body = order(
            vec![OrderLine {
                product_id: "a".repeat(24),
                quantity: 2,
            }],
            Some(" 1 Main St "),
            None,
        );
        let (address, method) = check_order(&body).unwrap();
        assert_eq!(address, "1 Main St");
        assert_eq!(method, "cod");
    }

    #[test]
    fn empty_order_reports_every_problem() {
        let body = order(Vec::new(), None, Some("barter"));
        match check_order(&body) {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn discount_is_a_percentage() {
        let product = listing::document(json!({"price": 200, "discount": 25}));
        assert_eq!(unit_price(&product), 150.0);
        let plain = listing::document(json!({"price": 9.5}));
        assert_eq!(unit_price(&plain), 9.5);
    }
}
