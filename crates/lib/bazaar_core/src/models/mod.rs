//! Domain models shared by the auth, query and store layers.

pub mod auth;

/// A stored document: a JSON object keyed by field name.
///
/// Every document carries an `id` and a `createdAt` field once stored.
pub type Document = serde_json::Map<String, serde_json::Value>;
