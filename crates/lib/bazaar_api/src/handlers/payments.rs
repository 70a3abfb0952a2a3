//! Payment handlers. Payments are opened by order placement; these routes
//! only read them.

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use bazaar_core::auth::policy::ensure_visible;
use bazaar_core::query::catalog::PAYMENTS;

use super::listing;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ItemResponse, ListResponse};

/// `GET /payments`: customers see their own, admins see all.
pub async fn list_payments_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    listing::list(&state, &PAYMENTS, query.as_deref(), Some(&user.0)).await
}

/// `GET /payments/{id}`
pub async fn get_payment_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ItemResponse>> {
    let doc = listing::fetch(&state, &PAYMENTS, &id).await?;
    ensure_visible(&user.0, &PAYMENTS, &doc)?;
    Ok(Json(ItemResponse::new(doc)))
}
