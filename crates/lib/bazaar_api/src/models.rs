//! Request and response bodies.

use bazaar_core::auth::Session;
use bazaar_core::models::Document;
use bazaar_core::models::auth::PublicProfile;
use bazaar_core::query::PageMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: PublicProfile,
}

impl SessionResponse {
    pub fn new(message: impl Into<String>, session: Session) -> Self {
        Self {
            success: true,
            message: message.into(),
            token: session.token,
            expires_at: session.expires_at,
            user: session.profile,
        }
    }
}

/// Registration of an account that must wait for admin approval.
#[derive(Debug, Clone, Serialize)]
pub struct PendingResponse {
    pub success: bool,
    pub message: String,
    pub status: &'static str,
    pub user: PublicProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: PublicProfile,
}

/// Result of an admin action on one account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicProfile,
}

impl AccountResponse {
    pub fn new(message: impl Into<String>, user: PublicProfile) -> Self {
        Self {
            success: true,
            message: message.into(),
            user,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub success: bool,
    #[serde(flatten)]
    pub meta: PageMeta,
    pub items: Vec<Document>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemResponse {
    pub success: bool,
    pub item: Document,
}

impl ItemResponse {
    pub fn new(item: Document) -> Self {
        Self {
            success: true,
            item,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

/// Product fields a seller may set. Absent fields are left unchanged on
/// update and defaulted on create.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFields {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub discount: Option<f64>,
    pub instock: Option<bool>,
    /// A single category or a list of them.
    pub category: Option<Value>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    #[serde(flatten)]
    pub fields: ProductFields,
    /// Only honoured for admins; sellers always own what they create.
    #[serde(default)]
    pub seller_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLine {
    #[serde(alias = "product")]
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(rename = "shippingAddress", alias = "shipping_address")]
    pub shipping_address: Option<String>,
    #[serde(rename = "paymentMethod", alias = "payment_method", default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub product_id: Option<String>,
    pub order_id: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDelivery {
    pub order_id: Option<String>,
    pub deliverer_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryStatusRequest {
    pub status: Option<String>,
}
