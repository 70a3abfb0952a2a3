//! Customer, seller and deliverer directories.

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use bazaar_core::auth::policy::ensure_visible;
use bazaar_core::query::ResourceSpec;
use bazaar_core::query::catalog::{CUSTOMERS, DELIVERERS, PUBLIC_SELLERS, SELLERS};

use super::listing;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ItemResponse, ListResponse};

async fn get_account(
    state: &AppState,
    resource: &ResourceSpec,
    user: &AuthenticatedUser,
    id: &str,
) -> AppResult<Json<ItemResponse>> {
    let doc = listing::fetch(state, resource, id).await?;
    ensure_visible(&user.0, resource, &doc)?;
    Ok(Json(ItemResponse::new(listing::present(resource, doc))))
}

/// `GET /customers`: admins see all, customers see themselves.
pub async fn list_customers_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    listing::list(&state, &CUSTOMERS, query.as_deref(), Some(&user.0)).await
}

pub async fn get_customer_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ItemResponse>> {
    get_account(&state, &CUSTOMERS, &user, &id).await
}

/// `GET /sellers`: admins see all, sellers see themselves.
pub async fn list_sellers_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    listing::list(&state, &SELLERS, query.as_deref(), Some(&user.0)).await
}

pub async fn get_seller_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ItemResponse>> {
    get_account(&state, &SELLERS, &user, &id).await
}

/// `GET /sellers/public`: approved, active shops. No authentication.
pub async fn list_public_sellers_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    listing::list(&state, &PUBLIC_SELLERS, query.as_deref(), None).await
}

/// `GET /deliverers`: admins see all, deliverers see themselves.
pub async fn list_deliverers_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    listing::list(&state, &DELIVERERS, query.as_deref(), Some(&user.0)).await
}

pub async fn get_deliverer_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ItemResponse>> {
    get_account(&state, &DELIVERERS, &user, &id).await
}
