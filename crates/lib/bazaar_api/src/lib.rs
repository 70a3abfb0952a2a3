//! # bazaar_api
//!
//! HTTP API library for the Bazaar marketplace.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{MethodRouter, delete, get, patch, post, put};
use bazaar_core::auth::{
    AccessPolicy, AccountAdmin, AuthSettings, Authenticator, BcryptHasher, Gate, PasswordHasher,
    RevocationList, SessionVerifier,
};
use bazaar_core::models::auth::Role;
use bazaar_core::store::{CredentialStore, DocumentCredentials, DocumentStore};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{accounts, admin, auth, deliveries, orders, payments, products, reviews};
use crate::middleware::policy::Guard;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Entity documents (products, orders, ...).
    pub store: Arc<dyn DocumentStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub auth: Arc<Authenticator>,
    pub sessions: Arc<SessionVerifier>,
    pub policy: AccessPolicy,
    pub accounts: Arc<AccountAdmin>,
    /// Tokens revoked by logout. The server purges expired entries.
    pub revocations: Arc<RevocationList>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the auth components over `store` with a bcrypt hasher at the
    /// configured cost.
    pub fn new(store: Arc<dyn DocumentStore>, config: ApiConfig) -> Self {
        let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost));
        Self::with_hasher(store, config, hasher)
    }

    pub fn with_hasher(
        store: Arc<dyn DocumentStore>,
        config: ApiConfig,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(DocumentCredentials::new(Arc::clone(&store)));
        let revocations = Arc::new(RevocationList::new());
        let settings = AuthSettings::new(config.jwt_secret.clone(), config.token_days);
        Self {
            auth: Arc::new(Authenticator::new(
                Arc::clone(&credentials),
                hasher,
                Arc::clone(&revocations),
                settings.clone(),
            )),
            sessions: Arc::new(SessionVerifier::new(
                Arc::clone(&credentials),
                Arc::clone(&revocations),
                settings,
            )),
            policy: AccessPolicy::new(Arc::clone(&credentials)),
            accounts: Arc::new(AccountAdmin::new(Arc::clone(&credentials))),
            credentials,
            revocations,
            store,
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `bazaar_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    bazaar_core::migrate::migrate(pool).await
}

const ADMIN: &[Role] = &[Role::Admin];
const ADMIN_CUSTOMER: &[Role] = &[Role::Admin, Role::Customer];
const ADMIN_SELLER: &[Role] = &[Role::Admin, Role::Seller];
const ADMIN_DELIVERER: &[Role] = &[Role::Admin, Role::Deliverer];
const CUSTOMER: &[Role] = &[Role::Customer];
const ORDER_READERS: &[Role] = &[Role::Admin, Role::Customer, Role::Seller];
const DELIVERY_READERS: &[Role] = &[Role::Admin, Role::Deliverer, Role::Customer];

/// Put `route` behind session verification and `gate`.
fn gated(state: &AppState, gate: Gate, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    let guard = Guard {
        policy: state.policy.clone(),
        gate,
    };
    route
        .route_layer(from_fn_with_state(guard, middleware::policy::enforce))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ))
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let s = &state;

    // Public routes; a valid token is recognised but not required.
    let public = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/sellers/public", get(accounts::list_public_sellers_handler))
        .route("/products", get(products::list_products_handler))
        .route("/products/{id}", get(products::get_product_handler))
        .route("/reviews", get(reviews::list_reviews_handler))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::optional_auth,
        ));

    // Protected routes, each with its own gate.
    let protected = Router::new()
        .route(
            "/auth/me",
            gated(s, Gate::Authenticated, get(auth::me_handler)),
        )
        // Account administration.
        .route(
            "/admin/{kind}/pending",
            gated(s, Gate::Roles(ADMIN), get(admin::list_pending_handler)),
        )
        .route(
            "/admin/{kind}/{id}/approve",
            gated(s, Gate::Roles(ADMIN), patch(admin::approve_handler)),
        )
        .route(
            "/admin/{kind}/{id}/reject",
            gated(s, Gate::Roles(ADMIN), patch(admin::reject_handler)),
        )
        .route(
            "/admin/{kind}/{id}/status",
            gated(s, Gate::Roles(ADMIN), patch(admin::set_status_handler)),
        )
        .route(
            "/admin/{kind}/{id}",
            gated(s, Gate::Roles(ADMIN), delete(admin::delete_account_handler)),
        )
        // Account directories.
        .route(
            "/customers",
            gated(s, Gate::Roles(ADMIN_CUSTOMER), get(accounts::list_customers_handler)),
        )
        .route(
            "/customers/{id}",
            gated(s, Gate::Roles(ADMIN_CUSTOMER), get(accounts::get_customer_handler)),
        )
        .route(
            "/sellers",
            gated(s, Gate::Roles(ADMIN_SELLER), get(accounts::list_sellers_handler)),
        )
        .route(
            "/sellers/{id}",
            gated(s, Gate::Roles(ADMIN_SELLER), get(accounts::get_seller_handler)),
        )
        .route(
            "/deliverers",
            gated(s, Gate::Roles(ADMIN_DELIVERER), get(accounts::list_deliverers_handler)),
        )
        .route(
            "/deliverers/{id}",
            gated(s, Gate::Roles(ADMIN_DELIVERER), get(accounts::get_deliverer_handler)),
        )
        // Catalogue management.
        .route(
            "/products",
            gated(
                s,
                Gate::AdminOrApproved(Role::Seller),
                post(products::create_product_handler),
            ),
        )
        .route(
            "/products/{id}",
            gated(
                s,
                Gate::AdminOrApproved(Role::Seller),
                put(products::update_product_handler).delete(products::delete_product_handler),
            ),
        )
        // Orders and payments.
        .route(
            "/orders",
            gated(s, Gate::Roles(ORDER_READERS), get(orders::list_orders_handler))
                .merge(gated(s, Gate::Roles(CUSTOMER), post(orders::create_order_handler))),
        )
        .route(
            "/orders/{id}",
            gated(s, Gate::Roles(ORDER_READERS), get(orders::get_order_handler)),
        )
        .route(
            "/payments",
            gated(s, Gate::Roles(ADMIN_CUSTOMER), get(payments::list_payments_handler)),
        )
        .route(
            "/payments/{id}",
            gated(s, Gate::Roles(ADMIN_CUSTOMER), get(payments::get_payment_handler)),
        )
        // Reviews and deliveries.
        .route(
            "/reviews",
            gated(s, Gate::Roles(CUSTOMER), post(reviews::create_review_handler)),
        )
        .route(
            "/deliveries",
            gated(s, Gate::Roles(DELIVERY_READERS), get(deliveries::list_deliveries_handler))
                .merge(gated(s, Gate::Roles(ADMIN), post(deliveries::create_delivery_handler))),
        )
        .route(
            "/deliveries/{id}",
            gated(s, Gate::Roles(DELIVERY_READERS), get(deliveries::get_delivery_handler)),
        )
        .route(
            "/deliveries/{id}/status",
            gated(
                s,
                Gate::AdminOrApproved(Role::Deliverer),
                patch(deliveries::update_delivery_status_handler),
            ),
        );

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
