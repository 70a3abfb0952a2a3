//! In-process evaluation of filters and sort orders against documents.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Filter, Predicate, Sort, SortOrder, Term};
use crate::models::Document;

/// True if `doc` satisfies every term of `filter`.
pub fn matches(doc: &Document, filter: &Filter) -> bool {
    filter.terms().iter().all(|term| match term {
        Term::Field { field, predicate } => field_matches(doc.get(field), predicate),
        Term::AnyOf(alternatives) => alternatives
            .iter()
            .any(|(field, predicate)| field_matches(doc.get(field), predicate)),
    })
}

fn field_matches(value: Option<&Value>, predicate: &Predicate) -> bool {
    let Some(value) = value else {
        return false;
    };
    match predicate {
        Predicate::Eq(expected) => match value {
            Value::Array(items) => items.iter().any(|v| values_equal(v, expected)),
            v => values_equal(v, expected),
        },
        Predicate::Contains(needle) => value
            .as_str()
            .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
        Predicate::Range { min, max } => value.as_f64().is_some_and(|n| {
            min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m)
        }),
        Predicate::DateRange { from, to } => as_time(value).is_some_and(|t| {
            from.is_none_or(|f| t >= f) && to.is_none_or(|end| t <= end)
        }),
        Predicate::In(options) => match value {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .any(|s| options.iter().any(|o| o == s)),
            v => v.as_str().is_some_and(|s| options.iter().any(|o| o == s)),
        },
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn as_time(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Order two documents by `sort`, breaking ties by `id`.
pub fn compare(a: &Document, b: &Document, sort: &Sort) -> Ordering {
    let primary = compare_values(a.get(&sort.field), b.get(&sort.field));
    let primary = match sort.order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| compare_values(a.get("id"), b.get("id")))
}

/// Missing and null sort first; then booleans, numbers, strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
