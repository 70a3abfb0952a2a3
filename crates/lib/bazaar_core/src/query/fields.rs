//! Compile-time description of what a list endpoint may filter on.

use serde_json::Value;

use super::Predicate;
use crate::models::auth::{Principal, Role};

/// How a filterable field interprets its query parameter(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Case-insensitive substring match.
    String,
    /// `true` / `false`; anything else is dropped.
    Boolean,
    /// Exact numeric match.
    Number,
    /// `{field}_min` / `{field}_max` inclusive bounds, or exact match on `{field}`.
    NumberRange,
    /// `{field}_from` / `{field}_to` inclusive bounds; `_to` covers the whole day.
    DateRange,
    /// 24-hex-character identifier; malformed values are dropped.
    ObjectId,
    /// Comma-separated or repeated values; set membership.
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Mandatory filter derived from the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    /// The principal sees only the document whose `id` is its own.
    OwnId,
    /// The principal sees only documents whose `field` equals its id.
    OwnerField(&'static str),
}

impl ScopeRule {
    /// The field and predicate this rule pins for `principal`.
    pub fn pin(self, principal: &Principal) -> (&'static str, Predicate) {
        let id = Predicate::Eq(Value::String(principal.id.clone()));
        match self {
            ScopeRule::OwnId => ("id", id),
            ScopeRule::OwnerField(field) => (field, id),
        }
    }
}

/// Literal used by fixed resource filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixed {
    Str(&'static str),
    Bool(bool),
}

impl Fixed {
    pub fn to_value(self) -> Value {
        match self {
            Fixed::Str(s) => Value::String(s.to_string()),
            Fixed::Bool(b) => Value::Bool(b),
        }
    }
}

/// Everything the query builder needs to know about one list endpoint.
#[derive(Debug)]
pub struct ResourceSpec {
    pub name: &'static str,
    pub collection: &'static str,
    /// Fields OR-ed together by the `search` parameter.
    pub search_fields: &'static [&'static str],
    pub fields: &'static [FieldSpec],
    /// Per-role mandatory scopes.
    pub scopes: &'static [(Role, ScopeRule)],
    /// Filters applied to every request, locked like scopes.
    pub defaults: &'static [(&'static str, Fixed)],
    /// Foreign key naming the owning principal, for ownership checks.
    pub owner_field: Option<&'static str>,
    /// Fields stripped before documents leave the service.
    pub hidden_fields: &'static [&'static str],
}

impl ResourceSpec {
    pub fn scope_for(&self, role: Role) -> Option<ScopeRule> {
        self.scopes
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, rule)| *rule)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Sorting is allowed on declared filter and search fields plus timestamps.
    pub fn is_sortable(&self, name: &str) -> bool {
        matches!(name, "createdAt" | "updatedAt")
            || self.field(name).is_some()
            || self.search_fields.contains(&name)
    }

    /// Singular noun for one document of this resource, for messages.
    pub fn singular(&self) -> &'static str {
        match self.name {
            "deliveries" => "delivery",
            "public_sellers" => "seller",
            other => other.strip_suffix('s').unwrap_or(other),
        }
    }

    /// Remove hidden fields from a document in place.
    pub fn redact(&self, doc: &mut crate::models::Document) {
        for field in self.hidden_fields {
            doc.remove(*field);
        }
    }
}
