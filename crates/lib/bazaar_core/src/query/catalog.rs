//! Resource declarations for every list endpoint.

use super::fields::{FieldKind as K, FieldSpec as F, Fixed, ResourceSpec, ScopeRule};
use crate::models::auth::Role;

const CREDENTIAL_SECRETS: &[&str] = &["passwordHash"];

pub static CUSTOMERS: ResourceSpec = ResourceSpec {
    name: "customers",
    collection: "customers",
    search_fields: &["name", "email", "phone_no", "address"],
    fields: &[
        F::new("name", K::String),
        F::new("email", K::String),
        F::new("phone_no", K::String),
        F::new("isActive", K::Boolean),
    ],
    scopes: &[(Role::Customer, ScopeRule::OwnId)],
    defaults: &[],
    owner_field: Some("id"),
    hidden_fields: CREDENTIAL_SECRETS,
};

pub static SELLERS: ResourceSpec = ResourceSpec {
    name: "sellers",
    collection: "sellers",
    search_fields: &["name", "email", "shopName", "phone_no", "address"],
    fields: &[
        F::new("status", K::String),
        F::new("name", K::String),
        F::new("email", K::String),
        F::new("shopName", K::String),
        F::new("isActive", K::Boolean),
    ],
    scopes: &[(Role::Seller, ScopeRule::OwnId)],
    defaults: &[],
    owner_field: Some("id"),
    hidden_fields: CREDENTIAL_SECRETS,
};

/// Public seller directory: approved, active shops only.
pub static PUBLIC_SELLERS: ResourceSpec = ResourceSpec {
    name: "public_sellers",
    collection: "sellers",
    search_fields: &["name", "shopName", "address"],
    fields: &[F::new("address", K::String), F::new("shopName", K::String)],
    scopes: &[],
    defaults: &[("status", Fixed::Str("approved")), ("isActive", Fixed::Bool(true))],
    owner_field: None,
    hidden_fields: &[
        "passwordHash",
        "approvedBy",
        "approvedAt",
        "rejectionReason",
        "isActive",
        "status",
    ],
};

pub static DELIVERERS: ResourceSpec = ResourceSpec {
    name: "deliverers",
    collection: "deliverers",
    search_fields: &[
        "name",
        "email",
        "phone_no",
        "address",
        "vehicle_no",
        "vehicle_type",
    ],
    fields: &[
        F::new("name", K::String),
        F::new("email", K::String),
        F::new("phone_no", K::String),
        F::new("status", K::String),
        F::new("vehicle_no", K::String),
        F::new("vehicle_type", K::String),
        F::new("isActive", K::Boolean),
    ],
    scopes: &[(Role::Deliverer, ScopeRule::OwnId)],
    defaults: &[],
    owner_field: Some("id"),
    hidden_fields: CREDENTIAL_SECRETS,
};

pub static PRODUCTS: ResourceSpec = ResourceSpec {
    name: "products",
    collection: "products",
    search_fields: &["name", "description"],
    fields: &[
        F::new("instock", K::Boolean),
        F::new("price", K::NumberRange),
        F::new("discount", K::NumberRange),
        F::new("seller_id", K::ObjectId),
        F::new("category", K::Array),
    ],
    scopes: &[(Role::Seller, ScopeRule::OwnerField("seller_id"))],
    defaults: &[],
    owner_field: Some("seller_id"),
    hidden_fields: &[],
};

pub static ORDERS: ResourceSpec = ResourceSpec {
    name: "orders",
    collection: "orders",
    search_fields: &[],
    fields: &[
        F::new("status", K::String),
        F::new("customer_id", K::ObjectId),
        F::new("total_amount", K::NumberRange),
        F::new("order_date", K::DateRange),
    ],
    scopes: &[
        (Role::Customer, ScopeRule::OwnerField("customer_id")),
        (Role::Seller, ScopeRule::OwnerField("seller_ids")),
    ],
    defaults: &[],
    owner_field: Some("customer_id"),
    hidden_fields: &[],
};

pub static PAYMENTS: ResourceSpec = ResourceSpec {
    name: "payments",
    collection: "payments",
    search_fields: &[],
    fields: &[
        F::new("payment_method", K::String),
        F::new("order_id", K::ObjectId),
        F::new("amount", K::NumberRange),
    ],
    scopes: &[(Role::Customer, ScopeRule::OwnerField("customer_id"))],
    defaults: &[],
    owner_field: Some("customer_id"),
    hidden_fields: &[],
};

pub static REVIEWS: ResourceSpec = ResourceSpec {
    name: "reviews",
    collection: "reviews",
    search_fields: &["comment"],
    fields: &[
        F::new("product_id", K::ObjectId),
        F::new("order_id", K::ObjectId),
        F::new("customer_id", K::ObjectId),
        F::new("rating", K::NumberRange),
    ],
    scopes: &[],
    defaults: &[],
    owner_field: Some("customer_id"),
    hidden_fields: &[],
};

pub static DELIVERIES: ResourceSpec = ResourceSpec {
    name: "deliveries",
    collection: "deliveries",
    search_fields: &["address"],
    fields: &[
        F::new("status", K::String),
        F::new("order_id", K::ObjectId),
        F::new("deliverer_id", K::ObjectId),
        F::new("delivered_date", K::DateRange),
    ],
    scopes: &[
        (Role::Deliverer, ScopeRule::OwnerField("deliverer_id")),
        (Role::Customer, ScopeRule::OwnerField("customer_id")),
    ],
    defaults: &[],
    owner_field: Some("deliverer_id"),
    hidden_fields: &[],
};

/// The list resource backed by a role's credential collection.
pub fn for_role(role: Role) -> Option<&'static ResourceSpec> {
    match role {
        Role::Customer => Some(&CUSTOMERS),
        Role::Seller => Some(&SELLERS),
        Role::Deliverer => Some(&DELIVERERS),
        Role::Admin => None,
    }
}
