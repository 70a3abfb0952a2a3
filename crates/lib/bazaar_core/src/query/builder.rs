//! Query specification builder.
//!
//! Never fails: malformed values are dropped so the endpoint degrades to
//! "no such filter applied" instead of erroring.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::{Number, Value};
use tracing::debug;

use super::fields::{FieldKind, FieldSpec, ResourceSpec};
use super::params::QueryParams;
use super::{DEFAULT_LIMIT, Filter, Pagination, Predicate, QuerySpec, Sort, SortOrder};
use crate::ids::is_object_id;
use crate::models::auth::Principal;

/// Build the query specification for one list request.
///
/// Fixed resource filters and the principal's role scope are pinned first.
/// Caller filters come after and cannot touch a pinned field.
pub fn build(
    params: &QueryParams,
    resource: &ResourceSpec,
    principal: Option<&Principal>,
) -> QuerySpec {
    let mut filter = Filter::new();

    for (field, value) in resource.defaults {
        filter.scope(field, Predicate::Eq(value.to_value()));
    }

    if let Some(principal) = principal
        && let Some(rule) = resource.scope_for(principal.role)
    {
        let (field, predicate) = rule.pin(principal);
        filter.scope(field, predicate);
    }

    if let Some(term) = params.get("search")
        && !resource.search_fields.is_empty()
    {
        filter.any_of(
            resource
                .search_fields
                .iter()
                .map(|f| (f.to_string(), Predicate::Contains(term.to_string())))
                .collect(),
        );
    }

    for spec in resource.fields {
        if let Some(predicate) = field_predicate(params, spec)
            && !filter.and(spec.name, predicate)
        {
            debug!(
                resource = resource.name,
                field = spec.name,
                "ignoring caller filter on scoped field"
            );
        }
    }

    QuerySpec {
        filter,
        sort: build_sort(params, resource),
        pagination: build_pagination(params),
    }
}

/// Translate the parameter(s) for one declared field into a predicate.
fn field_predicate(params: &QueryParams, spec: &FieldSpec) -> Option<Predicate> {
    let name = spec.name;
    match spec.kind {
        FieldKind::String => params
            .get(name)
            .map(|v| Predicate::Contains(v.to_string())),
        FieldKind::Boolean => match params.get(name)?.to_ascii_lowercase().as_str() {
            "true" => Some(Predicate::Eq(Value::Bool(true))),
            "false" => Some(Predicate::Eq(Value::Bool(false))),
            _ => None,
        },
        FieldKind::Number => params
            .get(name)
            .and_then(parse_number)
            .and_then(number_value)
            .map(Predicate::Eq),
        FieldKind::NumberRange => {
            let min_key = format!("{name}_min");
            let max_key = format!("{name}_max");
            if params.contains(&min_key) || params.contains(&max_key) {
                let min = params.get(&min_key).and_then(parse_number);
                let max = params.get(&max_key).and_then(parse_number);
                if min.is_none() && max.is_none() {
                    return None;
                }
                Some(Predicate::Range { min, max })
            } else {
                params
                    .get(name)
                    .and_then(parse_number)
                    .and_then(number_value)
                    .map(Predicate::Eq)
            }
        }
        FieldKind::DateRange => {
            let from = params.get(&format!("{name}_from")).and_then(parse_date);
            let to = params
                .get(&format!("{name}_to"))
                .and_then(parse_date)
                .map(end_of_day);
            if from.is_none() && to.is_none() {
                return None;
            }
            Some(Predicate::DateRange { from, to })
        }
        FieldKind::ObjectId => params
            .get(name)
            .filter(|v| is_object_id(v))
            .map(|v| Predicate::Eq(Value::String(v.to_ascii_lowercase()))),
        FieldKind::Array => {
            let mut values: Vec<String> = params
                .get_all(name)
                .iter()
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
            match values.len() {
                0 => None,
                1 => values.pop().map(|v| Predicate::Eq(Value::String(v))),
                _ => Some(Predicate::In(values)),
            }
        }
    }
}

fn build_sort(params: &QueryParams, resource: &ResourceSpec) -> Sort {
    let Some(field) = params.get("sort") else {
        return Sort::default();
    };
    if !resource.is_sortable(field) {
        debug!(resource = resource.name, field, "ignoring unknown sort field");
        return Sort::default();
    }
    let order = match params.get("sortOrder") {
        Some(o) if o.eq_ignore_ascii_case("asc") => SortOrder::Asc,
        _ => SortOrder::Desc,
    };
    Sort {
        field: field.to_string(),
        order,
    }
}

fn build_pagination(params: &QueryParams) -> Pagination {
    let page = params
        .get("page")
        .and_then(parse_count)
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let limit = match params.get("limit").and_then(parse_count) {
        None | Some(0) => DEFAULT_LIMIT as i64,
        Some(n) => n,
    };
    Pagination::new(page.max(1) as u64, limit.max(1) as u64)
}

/// Parse an integer count. Digit strings too large for `i64` saturate.
fn parse_count(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return Some(i64::MAX);
    }
    None
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn number_value(n: f64) -> Option<Value> {
    Number::from_f64(n).map(Value::Number)
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    at.date_naive().and_time(last).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;
    use crate::query::catalog::{CUSTOMERS, ORDERS, PRODUCTS, PUBLIC_SELLERS, SELLERS};
    use crate::query::{MAX_LIMIT, Term};
    use chrono::TimeZone;

    const ME: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
    const OTHER: &str = "bbbbbbbbbbbbbbbbbbbbbbbb";

    fn principal(role: Role) -> Principal {
        Principal {
            id: ME.to_string(),
            role,
            active: true,
        }
    }

    #[test]
    fn customer_scope_cannot_be_overridden() {
        let params = QueryParams::parse(&format!("customer_id={OTHER}"));
        let spec = build(&params, &ORDERS, Some(&principal(Role::Customer)));
        assert_eq!(
            spec.filter.predicate("customer_id"),
            Some(&Predicate::Eq(ME.into()))
        );
        assert_eq!(spec.filter.terms().len(), 1);
    }

    #[test]
    fn own_id_scope_survives_id_like_params() {
        let params = QueryParams::parse(&format!("id={OTHER}&name=ann"));
        let spec = build(&params, &CUSTOMERS, Some(&principal(Role::Customer)));
        assert_eq!(spec.filter.predicate("id"), Some(&Predicate::Eq(ME.into())));
        assert_eq!(
            spec.filter.predicate("name"),
            Some(&Predicate::Contains("ann".into()))
        );
    }

    #[test]
    fn admin_gets_no_scope() {
        let params = QueryParams::parse(&format!("customer_id={OTHER}"));
        let spec = build(&params, &ORDERS, Some(&principal(Role::Admin)));
        assert_eq!(
            spec.filter.predicate("customer_id"),
            Some(&Predicate::Eq(OTHER.into()))
        );
        assert!(!spec.filter.is_locked("customer_id"));
    }

    #[test]
    fn limit_is_capped() {
        let spec = build(&QueryParams::parse("limit=99999"), &PRODUCTS, None);
        assert_eq!(spec.pagination.limit, MAX_LIMIT);

        let spec = build(
            &QueryParams::parse("limit=999999999999999999999999"),
            &PRODUCTS,
            None,
        );
        assert_eq!(spec.pagination.limit, MAX_LIMIT);
    }

    #[test]
    fn pagination_defaults_and_skip() {
        let spec = build(&QueryParams::new(), &PRODUCTS, None);
        assert_eq!(spec.pagination, Pagination::new(1, 10));

        let spec = build(&QueryParams::parse("page=3&limit=20"), &PRODUCTS, None);
        assert_eq!(spec.pagination.skip, 40);

        let spec = build(&QueryParams::parse("page=-4&limit=abc"), &PRODUCTS, None);
        assert_eq!(spec.pagination, Pagination::new(1, 10));

        let spec = build(&QueryParams::parse("limit=0"), &PRODUCTS, None);
        assert_eq!(spec.pagination.limit, 10);

        let spec = build(&QueryParams::parse("limit=-5"), &PRODUCTS, None);
        assert_eq!(spec.pagination.limit, 1);
    }

    #[test]
    fn search_ors_across_fields() {
        let spec = build(&QueryParams::parse("search=%20Lamp%20"), &PRODUCTS, None);
        assert_eq!(
            spec.filter.terms(),
            &[Term::AnyOf(vec![
                ("name".into(), Predicate::Contains("Lamp".into())),
                ("description".into(), Predicate::Contains("Lamp".into())),
            ])]
        );
    }

    #[test]
    fn search_is_ignored_without_search_fields() {
        let spec = build(&QueryParams::parse("search=x"), &ORDERS, None);
        assert!(spec.filter.is_empty());
    }

    #[test]
    fn number_range_bounds() {
        let spec = build(
            &QueryParams::parse("price_min=10&price_max=20.5"),
            &PRODUCTS,
            None,
        );
        assert_eq!(
            spec.filter.predicate("price"),
            Some(&Predicate::Range {
                min: Some(10.0),
                max: Some(20.5)
            })
        );

        let spec = build(&QueryParams::parse("price_max=5"), &PRODUCTS, None);
        assert_eq!(
            spec.filter.predicate("price"),
            Some(&Predicate::Range {
                min: None,
                max: Some(5.0)
            })
        );
    }

    #[test]
    fn number_range_falls_back_to_exact() {
        let spec = build(&QueryParams::parse("discount=15"), &PRODUCTS, None);
        assert_eq!(
            spec.filter.predicate("discount"),
            Some(&Predicate::Eq(serde_json::json!(15.0)))
        );
    }

    #[test]
    fn malformed_values_are_dropped() {
        let spec = build(
            &QueryParams::parse("price_min=cheap&instock=maybe&seller_id=nothex&discount=NaN"),
            &PRODUCTS,
            None,
        );
        assert!(spec.filter.is_empty(), "{:?}", spec.filter);
    }

    #[test]
    fn boolean_and_object_id() {
        let upper = OTHER.to_ascii_uppercase();
        let spec = build(
            &QueryParams::parse(&format!("instock=TRUE&seller_id={upper}")),
            &PRODUCTS,
            None,
        );
        assert_eq!(
            spec.filter.predicate("instock"),
            Some(&Predicate::Eq(Value::Bool(true)))
        );
        assert_eq!(
            spec.filter.predicate("seller_id"),
            Some(&Predicate::Eq(OTHER.into()))
        );
    }

    #[test]
    fn array_accepts_commas_and_repeats() {
        let spec = build(&QueryParams::parse("category=a,%20b,,c"), &PRODUCTS, None);
        assert_eq!(
            spec.filter.predicate("category"),
            Some(&Predicate::In(vec!["a".into(), "b".into(), "c".into()]))
        );

        let spec = build(
            &QueryParams::parse("category[]=a&category[]=b"),
            &PRODUCTS,
            None,
        );
        assert_eq!(
            spec.filter.predicate("category"),
            Some(&Predicate::In(vec!["a".into(), "b".into()]))
        );

        let spec = build(&QueryParams::parse("category=solo"), &PRODUCTS, None);
        assert_eq!(
            spec.filter.predicate("category"),
            Some(&Predicate::Eq("solo".into()))
        );
    }

    #[test]
    fn date_range_to_is_end_of_day() {
        let spec = build(
            &QueryParams::parse("order_date_from=2024-03-01&order_date_to=2024-03-31T08:00:00Z"),
            &ORDERS,
            None,
        );
        let expected_to = Utc
            .with_ymd_and_hms(2024, 3, 31, 23, 59, 59)
            .unwrap()
            + chrono::Duration::milliseconds(999);
        assert_eq!(
            spec.filter.predicate("order_date"),
            Some(&Predicate::DateRange {
                from: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
                to: Some(expected_to),
            })
        );
    }

    #[test]
    fn invalid_dates_are_dropped() {
        let spec = build(
            &QueryParams::parse("order_date_from=yesterday&order_date_to=soon"),
            &ORDERS,
            None,
        );
        assert!(spec.filter.predicate("order_date").is_none());
    }

    #[test]
    fn sort_defaults_and_whitelist() {
        let spec = build(&QueryParams::new(), &PRODUCTS, None);
        assert_eq!(spec.sort, Sort::default());

        let spec = build(&QueryParams::parse("sort=price&sortOrder=asc"), &PRODUCTS, None);
        assert_eq!(
            spec.sort,
            Sort {
                field: "price".into(),
                order: SortOrder::Asc
            }
        );

        let spec = build(&QueryParams::parse("sort=price"), &PRODUCTS, None);
        assert_eq!(spec.sort.order, SortOrder::Desc);

        let spec = build(&QueryParams::parse("sort=passwordHash"), &SELLERS, None);
        assert_eq!(spec.sort, Sort::default());
    }

    #[test]
    fn fixed_filters_are_locked() {
        let spec = build(&QueryParams::parse("status=pending"), &PUBLIC_SELLERS, None);
        assert_eq!(
            spec.filter.predicate("status"),
            Some(&Predicate::Eq("approved".into()))
        );
        assert_eq!(
            spec.filter.predicate("isActive"),
            Some(&Predicate::Eq(Value::Bool(true)))
        );
    }

    #[test]
    fn restrict_after_build_drops_caller_term() {
        let params = QueryParams::parse(&format!("customer_id={OTHER}"));
        let mut spec = build(&params, &ORDERS, Some(&principal(Role::Admin)));
        spec.restrict("customer_id", Predicate::Eq(ME.into()));
        assert_eq!(
            spec.filter.predicate("customer_id"),
            Some(&Predicate::Eq(ME.into()))
        );
        assert_eq!(spec.filter.terms().len(), 1);
    }
}
