//! Delivery handlers.
//!
//! Admins assign deliveries; deliverers see and progress their own; customers
//! see deliveries for their orders.

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use bazaar_core::auth::policy::{ensure_owner, ensure_visible};
use bazaar_core::ids::{is_object_id, timestamp};
use bazaar_core::models::auth::Role;
use bazaar_core::query::catalog::{DELIVERIES, ORDERS};
use bazaar_core::store::patch;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;

use super::{AppJson, listing};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{DeliveryStatusRequest, ItemResponse, ListResponse, NewDelivery};

const STATUSES: &[&str] = &["assigned", "picked_up", "in_transit", "delivered", "failed"];

/// `GET /deliveries`
pub async fn list_deliveries_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    listing::list(&state, &DELIVERIES, query.as_deref(), Some(&user.0)).await
}

/// `GET /deliveries/{id}`
pub async fn get_delivery_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ItemResponse>> {
    let doc = listing::fetch(&state, &DELIVERIES, &id).await?;
    ensure_visible(&user.0, &DELIVERIES, &doc)?;
    Ok(Json(ItemResponse::new(doc)))
}

fn required_id<'a>(errors: &mut Vec<String>, label: &str, value: Option<&'a str>) -> Option<&'a str> {
    match value.map(str::trim) {
        None | Some("") => {
            errors.push(format!("{label} is required"));
            None
        }
        Some(id) if !is_object_id(id) => {
            errors.push(format!("Invalid {}", label.to_lowercase()));
            None
        }
        Some(id) => Some(id),
    }
}

/// `POST /deliveries`: assign an order to an approved, active deliverer.
pub async fn create_delivery_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    AppJson(body): AppJson<NewDelivery>,
) -> AppResult<(StatusCode, Json<ItemResponse>)> {
    let mut errors = Vec::new();
    let order_id = required_id(&mut errors, "Order id", body.order_id.as_deref());
    let deliverer_id = required_id(&mut errors, "Deliverer id", body.deliverer_id.as_deref());
    let (Some(order_id), Some(deliverer_id)) = (order_id, deliverer_id) else {
        return Err(AppError::Validation(errors));
    };

    let order = listing::fetch(&state, &ORDERS, order_id).await?;
    let deliverer = state
        .credentials
        .find_by_id(Role::Deliverer, deliverer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Deliverer not found".into()))?;
    if !deliverer.is_approved() || !deliverer.is_active() {
        return Err(AppError::validation(
            "Deliverer must be approved and active to take deliveries",
        ));
    }

    let address = body
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .or_else(|| {
            order
                .get("shippingAddress")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_default();
    let delivery = listing::document(json!({
        "order_id": order_id,
        "deliverer_id": deliverer_id,
        "customer_id": order.get("customer_id").cloned().unwrap_or(Value::Null),
        "address": address,
        "status": "assigned",
        "delivered_date": Value::Null,
    }));
    let stored = state.store.insert(DELIVERIES.collection, delivery).await?;
    info!(order = %order_id, deliverer = %deliverer_id, by = %user.0.id, "delivery assigned");
    Ok((StatusCode::CREATED, Json(ItemResponse::new(stored))))
}

/// `PATCH /deliveries/{id}/status`: the assigned deliverer, or an admin,
/// moves the delivery along. `delivered` stamps `delivered_date`.
pub async fn update_delivery_status_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(body): AppJson<DeliveryStatusRequest>,
) -> AppResult<Json<ItemResponse>> {
    let status = body
        .status
        .as_deref()
        .map(str::trim)
        .and_then(|s| STATUSES.iter().copied().find(|known| *known == s))
        .ok_or_else(|| {
            AppError::validation(format!("Status must be one of: {}", STATUSES.join(", ")))
        })?;

    let existing = listing::fetch(&state, &DELIVERIES, &id).await?;
    ensure_owner(&user.0, &DELIVERIES, &existing)?;

    let changes = if status == "delivered" {
        patch([
            ("status", status.into()),
            ("delivered_date", timestamp(Utc::now()).into()),
        ])
    } else {
        patch([("status", status.into())])
    };
    let updated = state
        .store
        .update(DELIVERIES.collection, &id, changes)
        .await?
        .ok_or_else(|| listing::not_found(&DELIVERIES))?;
    info!(id = %id, status, by = %user.0.id, "delivery status changed");
    Ok(Json(ItemResponse::new(updated)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_ids_report_missing_and_malformed() {
        let mut errors = Vec::new();
        assert_eq!(required_id(&mut errors, "Order id", None), None);
        assert_eq!(required_id(&mut errors, "Deliverer id", Some("xyz")), None);
        let good = "c".repeat(24);
        assert_eq!(
            required_id(&mut errors, "Order id", Some(&good)),
            Some(good.as_str())
        );
        assert_eq!(errors, vec!["Order id is required", "Invalid deliverer id"]);
    }
}
