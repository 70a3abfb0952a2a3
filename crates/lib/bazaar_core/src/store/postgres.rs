//! PostgreSQL document store.
//!
//! All collections share the `documents` table (see
//! `migrations/0001_documents.sql`). Filters compile to JSONB predicates;
//! field names and values are always bound parameters.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{DocumentStore, Page, StoreError, UniqueGuard, stamp_new, stamp_patch};
use crate::ids::timestamp;
use crate::models::Document;
use crate::query::{Filter, Predicate, QuerySpec, SortOrder, Term};

/// Document store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape `LIKE` metacharacters so the needle matches literally.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// `field` as float8, or NULL when it is not a JSON number.
fn push_numeric(qb: &mut QueryBuilder<'_, Postgres>, field: &str) {
    qb.push("(CASE WHEN jsonb_typeof(body -> ")
        .push_bind(field.to_string())
        .push(") = 'number' THEN (body ->> ")
        .push_bind(field.to_string())
        .push(")::float8 END)");
}

fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, field: &str, predicate: &Predicate) {
    match predicate {
        Predicate::Eq(value) => {
            qb.push("(body -> ")
                .push_bind(field.to_string())
                .push(") @> ")
                .push_bind(Json(value.clone()));
        }
        Predicate::Contains(needle) => {
            qb.push("(body ->> ")
                .push_bind(field.to_string())
                .push(") ILIKE ")
                .push_bind(like_pattern(needle));
        }
        Predicate::Range { min, max } => {
            qb.push("(TRUE");
            if let Some(min) = min {
                qb.push(" AND ");
                push_numeric(qb, field);
                qb.push(" >= ").push_bind(*min);
            }
            if let Some(max) = max {
                qb.push(" AND ");
                push_numeric(qb, field);
                qb.push(" <= ").push_bind(*max);
            }
            qb.push(" AND body ? ").push_bind(field.to_string()).push(")");
        }
        // Stored timestamps are fixed-width RFC 3339, so text order is time order.
        Predicate::DateRange { from, to } => {
            qb.push("(body ? ").push_bind(field.to_string());
            if let Some(from) = from {
                qb.push(" AND (body ->> ")
                    .push_bind(field.to_string())
                    .push(") >= ")
                    .push_bind(timestamp(*from));
            }
            if let Some(to) = to {
                qb.push(" AND (body ->> ")
                    .push_bind(field.to_string())
                    .push(") <= ")
                    .push_bind(timestamp(*to));
            }
            qb.push(")");
        }
        Predicate::In(options) => {
            qb.push("(body -> ")
                .push_bind(field.to_string())
                .push(") ?| ")
                .push_bind(options.clone());
        }
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, collection: &str, filter: &Filter) {
    qb.push(" WHERE collection = ").push_bind(collection.to_string());
    for term in filter.terms() {
        qb.push(" AND ");
        match term {
            Term::Field { field, predicate } => push_predicate(qb, field, predicate),
            Term::AnyOf(alternatives) => {
                qb.push("(FALSE");
                for (field, predicate) in alternatives {
                    qb.push(" OR ");
                    push_predicate(qb, field, predicate);
                }
                qb.push(")");
            }
        }
    }
}

fn select_page(collection: &str, spec: &QuerySpec) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT body FROM documents");
    push_where(&mut qb, collection, &spec.filter);
    let direction = match spec.sort.order {
        SortOrder::Asc => " ASC NULLS FIRST",
        SortOrder::Desc => " DESC NULLS LAST",
    };
    qb.push(" ORDER BY body -> ")
        .push_bind(spec.sort.field.clone())
        .push(direction)
        .push(", id ASC LIMIT ")
        .push_bind(i64::try_from(spec.pagination.limit).unwrap_or(i64::MAX))
        .push(" OFFSET ")
        .push_bind(i64::try_from(spec.pagination.skip).unwrap_or(i64::MAX));
    qb
}

fn count_matches(collection: &str, filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM documents");
    push_where(&mut qb, collection, filter);
    qb
}

fn doc_id(doc: &Document) -> String {
    doc.get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict {
            field: "id".to_string(),
        },
        _ => StoreError::Db(err),
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, collection: &str, spec: &QuerySpec) -> Result<Page, StoreError> {
        let total: i64 = count_matches(collection, &spec.filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        let rows: Vec<Json<Document>> = select_page(collection, spec)
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;
        Ok(Page {
            items: rows.into_iter().map(|Json(doc)| doc).collect(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let mut qb = QueryBuilder::new("SELECT body FROM documents");
        push_where(&mut qb, collection, filter);
        qb.push(" ORDER BY inserted_at, id LIMIT 1");
        let row: Option<Json<Document>> =
            qb.build_query_scalar().fetch_optional(&self.pool).await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Document>>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = stamp_new(doc);
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(doc_id(&doc))
            .bind(Json(&doc))
            .execute(&self.pool)
            .await
            .map_err(map_insert_error)?;
        Ok(doc)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        doc: Document,
        guard: &UniqueGuard,
    ) -> Result<Document, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent inserts of the same guarded value.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}:{}", guard.field, guard.value))
            .execute(&mut *tx)
            .await?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM documents \
             WHERE collection = ANY($1) AND body ->> $2 = $3)",
        )
        .bind(&guard.collections)
        .bind(&guard.field)
        .bind(&guard.value)
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            return Err(StoreError::Conflict {
                field: guard.field.clone(),
            });
        }

        let doc = stamp_new(doc);
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(doc_id(&doc))
            .bind(Json(&doc))
            .execute(&mut *tx)
            .await
            .map_err(map_insert_error)?;
        tx.commit().await?;
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Document>>(
            "UPDATE documents SET body = body || $3 \
             WHERE collection = $1 AND id = $2 RETURNING body",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(stamp_patch(patch)))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Pagination, Sort};
    use serde_json::json;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("lamp"), "%lamp%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn empty_filter_only_pins_collection() {
        let qb = count_matches("products", &Filter::new());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM documents WHERE collection = $1");
    }

    #[test]
    fn field_names_and_values_are_bound() {
        let mut filter = Filter::new();
        filter.and("price", Predicate::Range { min: Some(1.0), max: None });
        filter.and("name'; DROP TABLE documents; --", Predicate::Eq(json!("x")));
        let qb = count_matches("products", &filter);
        let sql = qb.sql();
        assert!(!sql.contains("DROP TABLE"));
        assert!(sql.contains("::float8 END) >= $4"));
        assert!(sql.contains("(body -> $6) @> $7"));
    }

    #[test]
    fn any_of_compiles_to_or_group() {
        let mut filter = Filter::new();
        filter.any_of(vec![
            ("name".into(), Predicate::Contains("lamp".into())),
            ("description".into(), Predicate::Contains("lamp".into())),
        ]);
        let qb = count_matches("products", &filter);
        assert!(qb.sql().ends_with(
            "AND (FALSE OR (body ->> $2) ILIKE $3 OR (body ->> $4) ILIKE $5)"
        ));
    }

    #[test]
    fn page_query_orders_then_limits() {
        let spec = QuerySpec {
            sort: Sort {
                field: "price".into(),
                order: SortOrder::Asc,
            },
            pagination: Pagination::new(3, 20),
            ..QuerySpec::default()
        };
        let qb = select_page("products", &spec);
        assert_eq!(
            qb.sql(),
            "SELECT body FROM documents WHERE collection = $1 \
             ORDER BY body -> $2 ASC NULLS FIRST, id ASC LIMIT $3 OFFSET $4"
        );
    }
}
