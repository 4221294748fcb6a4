//! Relational document store on sea-orm.
//!
//! Documents live in one `documents` table keyed by `(collection, id)` with
//! the JSON body in a text column. Filters and sort keys are compiled to
//! SQLite JSON1 expressions (`json_each`, `json_extract`), so counting,
//! filtering, sorting and windowing all happen in the database.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectOptions, ConnectionTrait,
    Database, DatabaseConnection, EntityTrait, IntoActiveModel, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Statement,
};
use serde_json::Value;

use super::{
    Document, DocumentStore, FindQuery, StoreError, document_id, merge_changes,
    prepare_new_document,
};
use crate::filtering::{ComparisonOperator, FilterPredicate, FilterValue, SortDirection};
use crate::geo::{GeoPoint, RadiusQuery};

pub mod entity {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "documents")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub collection: String,
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub body: Json,
        pub created_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

use entity::{ActiveModel, Column, Entity};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)";

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_collection_created ON documents (collection, created_at)";

/// Largest offset or limit SQLite accepts.
const SQL_MAX_ROWS: u64 = i64::MAX.unsigned_abs();

#[derive(Debug, Clone)]
pub struct SqlDocumentStore {
    db: DatabaseConnection,
}

impl SqlDocumentStore {
    /// Connect and create the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns a store error when the connection or schema creation fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let mut options = ConnectOptions::new(url);
        options.sqlx_logging(false);
        if url.contains(":memory:") {
            // Every pooled connection would otherwise get its own empty database.
            options.max_connections(1).min_connections(1);
        }
        let db = Database::connect(options).await?;
        Self::from_connection(db).await
    }

    /// Wrap an existing connection, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns a store error when schema creation fails.
    pub async fn from_connection(db: DatabaseConnection) -> Result<Self, StoreError> {
        let backend = db.get_database_backend();
        db.execute(Statement::from_string(backend, CREATE_TABLE)).await?;
        db.execute(Statement::from_string(backend, CREATE_INDEX)).await?;
        Ok(Self { db })
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// JSON path for a dotted field name, with every segment quoted.
fn json_path(field: &str) -> String {
    field
        .split('.')
        .fold(String::from("$"), |path, segment| format!("{path}.\"{segment}\""))
}

fn bind_value(value: &Value) -> Option<sea_orm::Value> {
    match value {
        Value::Bool(b) => Some(i64::from(*b).into()),
        Value::Number(n) => n
            .as_i64()
            .map(sea_orm::Value::from)
            .or_else(|| n.as_f64().map(sea_orm::Value::from)),
        Value::String(s) => Some(s.clone().into()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Type guard for `json_each.type` matching the expected value's JSON type.
fn type_guard(value: &Value) -> Option<&'static str> {
    match value {
        Value::Bool(_) => Some("json_each.type IN ('true', 'false')"),
        Value::Number(_) => Some("json_each.type IN ('integer', 'real')"),
        Value::String(_) => Some("json_each.type = 'text'"),
        Value::Null => Some("json_each.type = 'null'"),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// One `value <op> ?` test on a `json_each` row, or `None` if it can never match.
fn element_test(
    operator: ComparisonOperator,
    expected: &Value,
    values: &mut Vec<sea_orm::Value>,
) -> Option<String> {
    let guard = type_guard(expected)?;
    if expected.is_null() {
        // null only ever compares equal to null
        return matches!(
            operator,
            ComparisonOperator::Eq | ComparisonOperator::Gte | ComparisonOperator::Lte | ComparisonOperator::In
        )
        .then(|| guard.to_string());
    }
    let bound = bind_value(expected)?;
    values.push(bound);
    let symbol = match operator {
        ComparisonOperator::In => "=",
        other => other.sql_symbol(),
    };
    Some(format!("({guard} AND json_each.value {symbol} ?)"))
}

/// Compile one predicate to an `EXISTS` over the field's value(s).
///
/// `json_each` yields each element of an array field, or the value itself
/// for a scalar, so array fields match when any element matches. Object
/// values are excluded to keep members from matching.
fn predicate_expr(predicate: &FilterPredicate) -> SimpleExpr {
    let path = json_path(&predicate.field);
    let mut values: Vec<sea_orm::Value> = vec![path.clone().into(), path.into()];

    let tests: Vec<String> = match &predicate.value {
        FilterValue::Scalar(expected) => {
            element_test(predicate.operator, expected, &mut values).into_iter().collect()
        }
        FilterValue::List(options) => options
            .iter()
            .filter_map(|option| element_test(ComparisonOperator::In, option, &mut values))
            .collect(),
    };

    if tests.is_empty() {
        return Expr::cust("1 = 0");
    }

    Expr::cust_with_values(
        format!(
            "(COALESCE(json_type(documents.body, ?), '') <> 'object' AND EXISTS (SELECT 1 FROM json_each(documents.body, ?) WHERE {}))",
            tests.join(" OR ")
        ),
        values,
    )
}

fn filter_condition(collection: &str, filters: &[FilterPredicate]) -> Condition {
    filters.iter().fold(
        Condition::all().add(Column::Collection.eq(collection)),
        |condition, predicate| condition.add(predicate_expr(predicate)),
    )
}

fn into_document(collection: &str, model: entity::Model) -> Result<Document, StoreError> {
    match model.body {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Corrupt {
            collection: collection.to_string(),
            id: model.id,
        }),
    }
}

impl SqlDocumentStore {
    async fn find_model(&self, collection: &str, id: &str) -> Result<Option<entity::Model>, StoreError> {
        Ok(Entity::find()
            .filter(Column::Collection.eq(collection))
            .filter(Column::Id.eq(id))
            .one(&self.db)
            .await?)
    }
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn count(&self, collection: &str, filters: &[FilterPredicate]) -> Result<u64, StoreError> {
        Ok(Entity::find()
            .filter(filter_condition(collection, filters))
            .count(&self.db)
            .await?)
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let mut select = Entity::find().filter(filter_condition(collection, &query.filters));

        for key in &query.sort {
            let order = match key.direction {
                SortDirection::Ascending => Order::Asc,
                SortDirection::Descending => Order::Desc,
            };
            select = select.order_by(
                Expr::cust_with_values("json_extract(documents.body, ?)", [json_path(&key.field)]),
                order,
            );
        }
        // Insertion order breaks ties.
        select = select.order_by(Expr::cust("documents.rowid"), Order::Asc);

        // Past any row SQLite could hold.
        if query.skip > SQL_MAX_ROWS {
            return Ok(Vec::new());
        }
        if query.skip > 0 {
            select = select.offset(query.skip);
        }
        if let Some(limit) = query.limit {
            select = select.limit(limit.min(SQL_MAX_ROWS));
        }

        select
            .all(&self.db)
            .await?
            .into_iter()
            .map(|model| into_document(collection, model).map(|doc| query.projection.apply(doc)))
            .collect()
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.find_model(collection, id)
            .await?
            .map(|model| into_document(collection, model))
            .transpose()
    }

    async fn find_within(
        &self,
        collection: &str,
        field: &str,
        radius: &RadiusQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let (low, high) = radius.latitude_band();
        let latitude_path = format!("{}.\"coordinates\"[1]", json_path(field));
        let candidates = Entity::find()
            .filter(Column::Collection.eq(collection))
            .filter(Expr::cust_with_values(
                "json_extract(documents.body, ?) BETWEEN ? AND ?",
                [
                    sea_orm::Value::from(latitude_path),
                    sea_orm::Value::from(low),
                    sea_orm::Value::from(high),
                ],
            ))
            .order_by(Expr::cust("documents.rowid"), Order::Asc)
            .all(&self.db)
            .await?;

        let mut found = Vec::new();
        for model in candidates {
            let doc = into_document(collection, model)?;
            let inside = super::resolve_path(&doc, field)
                .and_then(GeoPoint::from_geojson)
                .is_some_and(|point| radius.contains(&point));
            if inside {
                found.push(doc);
            }
        }
        Ok(found)
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = prepare_new_document(doc);
        let id = document_id(&doc).unwrap_or_default().to_string();
        let created_at = doc
            .get(super::CREATED_AT_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let model = ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id),
            body: Set(Value::Object(doc.clone())),
            created_at: Set(created_at),
        };
        Entity::insert(model).exec_without_returning(&self.db).await?;
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let Some(model) = self.find_model(collection, id).await? else {
            return Ok(None);
        };
        let mut doc = into_document(collection, model.clone())?;
        merge_changes(&mut doc, changes);

        let mut active = model.into_active_model();
        active.body = Set(Value::Object(doc.clone()));
        active.update(&self.db).await?;
        Ok(Some(doc))
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = Entity::delete_many()
            .filter(Column::Collection.eq(collection))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_many(
        &self,
        collection: &str,
        filters: &[FilterPredicate],
    ) -> Result<u64, StoreError> {
        let result = Entity::delete_many()
            .filter(filter_condition(collection, filters))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_path_quotes_segments() {
        assert_eq!(json_path("averageCost"), "$.\"averageCost\"");
        assert_eq!(json_path("location.state"), "$.\"location\".\"state\"");
        assert_eq!(json_path("job-guarantee"), "$.\"job-guarantee\"");
    }

    #[test]
    fn test_bind_value() {
        assert_eq!(bind_value(&Value::from(5)), Some(sea_orm::Value::from(5_i64)));
        assert_eq!(bind_value(&Value::from(true)), Some(sea_orm::Value::from(1_i64)));
        assert_eq!(bind_value(&Value::Null), None);
    }

    #[test]
    fn test_null_only_matches_equality() {
        let mut values = Vec::new();
        assert!(element_test(ComparisonOperator::Gt, &Value::Null, &mut values).is_none());
        assert!(element_test(ComparisonOperator::Eq, &Value::Null, &mut values).is_some());
        assert!(values.is_empty());
    }

    #[test]
    fn test_element_test_binds_value() {
        let mut values = Vec::new();
        let sql = element_test(ComparisonOperator::Lte, &Value::from(10_000), &mut values).unwrap();
        assert!(sql.contains("json_each.value <= ?"));
        assert!(sql.contains("'integer', 'real'"));
        assert_eq!(values.len(), 1);
    }
}
