//! List-query construction.
//!
//! Raw request parameters go in, a [`QuerySpec`] comes out: a filter, a sort
//! order and a pagination window. Role scopes are applied before any
//! caller-supplied filter and lock their fields against it.

pub mod builder;
pub mod catalog;
pub mod fields;
pub mod matcher;
pub mod params;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

pub use builder::build;
pub use fields::{FieldKind, FieldSpec, ResourceSpec, ScopeRule};
pub use params::QueryParams;

/// Default page size.
pub const DEFAULT_LIMIT: u64 = 10;

/// Hard cap on page size, regardless of caller input.
pub const MAX_LIMIT: u64 = 100;

/// Condition on a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    /// Exact match. An array-valued field matches if it contains the value.
    Eq(Value),
    /// Case-insensitive substring match.
    Contains(String),
    /// Inclusive numeric bounds.
    Range { min: Option<f64>, max: Option<f64> },
    /// Inclusive date bounds.
    DateRange {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
    /// Set membership.
    In(Vec<String>),
}

/// One conjunct of a [`Filter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Term {
    Field { field: String, predicate: Predicate },
    /// Satisfied when any of the listed field conditions holds.
    AnyOf(Vec<(String, Predicate)>),
}

/// Conjunction of terms, with a set of fields that only scopes may constrain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Filter {
    terms: Vec<Term>,
    #[serde(skip)]
    locked: BTreeSet<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain `field` to `predicate` and lock it.
    ///
    /// Any earlier term on the same field is replaced, and later calls to
    /// [`Filter::and`] for the field are ignored.
    pub fn scope(&mut self, field: &str, predicate: Predicate) {
        self.terms
            .retain(|t| !matches!(t, Term::Field { field: f, .. } if f == field));
        self.terms.push(Term::Field {
            field: field.to_string(),
            predicate,
        });
        self.locked.insert(field.to_string());
    }

    /// Add a caller-supplied condition. Returns false if the field is locked
    /// by a scope, in which case nothing is added.
    pub fn and(&mut self, field: &str, predicate: Predicate) -> bool {
        if self.locked.contains(field) {
            return false;
        }
        self.terms
            .retain(|t| !matches!(t, Term::Field { field: f, .. } if f == field));
        self.terms.push(Term::Field {
            field: field.to_string(),
            predicate,
        });
        true
    }

    /// Add a disjunction across fields. Empty lists are ignored.
    pub fn any_of(&mut self, alternatives: Vec<(String, Predicate)>) {
        if !alternatives.is_empty() {
            self.terms.push(Term::AnyOf(alternatives));
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_locked(&self, field: &str) -> bool {
        self.locked.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The single-field condition on `field`, if any.
    pub fn predicate(&self, field: &str) -> Option<&Predicate> {
        self.terms.iter().find_map(|t| match t {
            Term::Field { field: f, predicate } if f == field => Some(predicate),
            _ => None,
        })
    }

    /// Shorthand for a locked equality filter.
    pub fn matching(field: &str, value: impl Into<Value>) -> Self {
        let mut filter = Self::new();
        filter.scope(field, Predicate::Eq(value.into()));
        filter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: "createdAt".to_string(),
            order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
}

impl Pagination {
    /// Clamp raw page/limit into a valid window.
    pub fn new(page: u64, limit: u64) -> Self {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_LIMIT);
        Self {
            page,
            limit,
            skip: (page - 1).saturating_mul(limit),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_LIMIT)
    }
}

/// Validated filter, sort and pagination for one list request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuerySpec {
    pub filter: Filter,
    pub sort: Sort,
    pub pagination: Pagination,
}

impl QuerySpec {
    /// Add a store-derived scope after building. Same guarantee as role
    /// scopes: the field is locked and any caller term on it is dropped.
    pub fn restrict(&mut self, field: &str, predicate: Predicate) {
        self.filter.scope(field, predicate);
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageMeta {
    pub fn new(total: u64, pagination: &Pagination) -> Self {
        let limit = pagination.limit.max(1);
        let total_pages = total.div_ceil(limit);
        Self {
            total,
            page: pagination.page,
            limit,
            total_pages,
            has_next_page: pagination.page < total_pages,
            has_prev_page: pagination.page > 1,
        }
    }
}
