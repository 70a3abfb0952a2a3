//! Account administration handlers. Every route here is admin-only.

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use bazaar_core::models::auth::Role;
use bazaar_core::query::catalog::for_role;
use bazaar_core::query::{Predicate, build};

use super::{AppJson, listing};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AccountResponse, ListResponse, MessageResponse, RejectRequest, StatusRequest};

/// Role owning the collection named in the path (`sellers`, `deliverers`, ...).
fn role_for(kind: &str) -> AppResult<Role> {
    Role::ALL
        .into_iter()
        .find(|role| role.collection() == kind)
        .ok_or_else(|| AppError::NotFound(format!("Unknown account type '{kind}'")))
}

/// `GET /admin/{kind}/pending`: sellers or deliverers awaiting approval.
pub async fn list_pending_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(kind): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse>> {
    let role = role_for(&kind)?;
    let resource = for_role(role)
        .filter(|_| role.requires_approval())
        .ok_or_else(|| {
            AppError::validation(format!(
                "{} accounts do not require approval",
                role.strategy().label
            ))
        })?;
    let mut spec = build(&listing::params(query.as_deref()), resource, Some(&user.0));
    spec.restrict("status", Predicate::Eq("pending".into()));
    listing::page(&state, resource, &spec).await
}

/// `PATCH /admin/{kind}/{id}/approve`
pub async fn approve_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<AccountResponse>> {
    let role = role_for(&kind)?;
    let record = state.accounts.approve(&user.0, role, &id).await?;
    Ok(Json(AccountResponse::new(
        format!("{} approved successfully", role.strategy().label),
        record.profile(),
    )))
}

/// `PATCH /admin/{kind}/{id}/reject`: body `{reason}`.
pub async fn reject_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path((kind, id)): Path<(String, String)>,
    AppJson(body): AppJson<RejectRequest>,
) -> AppResult<Json<AccountResponse>> {
    let role = role_for(&kind)?;
    let record = state
        .accounts
        .reject(&user.0, role, &id, body.reason.as_deref())
        .await?;
    Ok(Json(AccountResponse::new(
        format!("{} rejected", role.strategy().label),
        record.profile(),
    )))
}

/// `PATCH /admin/{kind}/{id}/status`: body `{isActive}`.
pub async fn set_status_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path((kind, id)): Path<(String, String)>,
    AppJson(body): AppJson<StatusRequest>,
) -> AppResult<Json<AccountResponse>> {
    let role = role_for(&kind)?;
    let record = state
        .accounts
        .set_active(&user.0, role, &id, body.is_active)
        .await?;
    let verb = if body.is_active { "activated" } else { "deactivated" };
    Ok(Json(AccountResponse::new(
        format!("{} {verb} successfully", role.strategy().label),
        record.profile(),
    )))
}

/// `DELETE /admin/{kind}/{id}`
pub async fn delete_account_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<MessageResponse>> {
    let role = role_for(&kind)?;
    state.accounts.delete(&user.0, role, &id).await?;
    Ok(Json(MessageResponse::new(format!(
        "{} deleted successfully",
        role.strategy().label
    ))))
}
