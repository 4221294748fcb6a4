use serde_json::{Map, Value};

use super::operators::ComparisonOperator;
use super::query_parser::{FilterValue, ParsedQuery, is_valid_field_name};
use super::sort::{SortKey, parse_sorting};
use crate::errors::ApiError;
use crate::store::{Document, ID_FIELD};

/// One `field <op> value` test. A query's predicates are conjoined.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicate {
    pub field: String,
    pub operator: ComparisonOperator,
    pub value: FilterValue,
}

impl FilterPredicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: ComparisonOperator::Eq,
            value: FilterValue::Scalar(value.into()),
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            operator: ComparisonOperator::In,
            value: FilterValue::List(values),
        }
    }
}

/// Fields to return. An empty projection means every field.
///
/// The identity field is always returned, whatever was selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projection = Self::default();
        for field in fields {
            projection = projection.with_field(field);
        }
        projection
    }

    /// Parse a comma separated `select` value.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a listed field name is invalid.
    pub fn parse(select: Option<&str>) -> Result<Self, ApiError> {
        let Some(select) = select else {
            return Ok(Self::all());
        };
        let mut projection = Self::default();
        for field in select.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            if !is_valid_field_name(field) {
                return Err(ApiError::validation(format!(
                    "Invalid field name '{field}' in select"
                )));
            }
            projection = projection.with_field(field);
        }
        Ok(projection)
    }

    /// Add a field if it is not already listed.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether `field` (or a parent or child path of it) is returned.
    #[must_use]
    pub fn includes(&self, field: &str) -> bool {
        self.is_all()
            || field == ID_FIELD
            || self.fields.iter().any(|selected| {
                selected == field
                    || is_path_prefix(selected, field)
                    || is_path_prefix(field, selected)
            })
    }

    /// Strip a document down to the projected fields.
    #[must_use]
    pub fn apply(&self, doc: Document) -> Document {
        if self.is_all() {
            return doc;
        }
        let mut projected = Map::new();
        if let Some(id) = doc.get(ID_FIELD) {
            projected.insert(ID_FIELD.to_string(), id.clone());
        }
        for field in &self.fields {
            copy_path(&doc, &mut projected, field);
        }
        projected
    }
}

fn is_path_prefix(prefix: &str, path: &str) -> bool {
    path.len() > prefix.len()
        && path.starts_with(prefix)
        && path.as_bytes()[prefix.len()] == b'.'
}

/// Copy `path` from `source` into `target`, creating nested objects on the way.
fn copy_path(source: &Document, target: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = source.get(path) {
                target.insert(path.to_string(), value.clone());
            }
        }
        Some((head, rest)) => {
            let Some(Value::Object(child)) = source.get(head) else {
                return;
            };
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(nested) = entry {
                copy_path(child, nested, rest);
            }
        }
    }
}

/// A query ready for a store: predicates, projection and sort order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub filters: Vec<FilterPredicate>,
    pub projection: Projection,
    pub sort: Vec<SortKey>,
}

/// Compile a parsed query. Predicates keep their encounter order.
///
/// # Errors
///
/// Returns a validation error for invalid `select` or `sort` field names.
pub fn compile(parsed: &ParsedQuery) -> Result<CompiledQuery, ApiError> {
    Ok(CompiledQuery {
        filters: parsed.filters.clone(),
        projection: Projection::parse(parsed.select.as_deref())?,
        sort: parse_sorting(parsed.sort.as_deref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::sort::SortDirection;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_projection_parse_trims_and_dedupes() {
        let projection = Projection::parse(Some(" name, description,,name ")).unwrap();
        assert_eq!(projection.fields(), ["name", "description"]);
    }

    #[test]
    fn test_projection_parse_rejects_bad_names() {
        assert!(Projection::parse(Some("name,$where")).is_err());
    }

    #[test]
    fn test_empty_select_means_all() {
        assert!(Projection::parse(Some("")).unwrap().is_all());
        assert!(Projection::parse(None).unwrap().is_all());
    }

    #[test]
    fn test_apply_keeps_id() {
        let projection = Projection::of(["name"]);
        let out = projection.apply(doc(json!({"id": "1", "name": "Dev", "averageCost": 10})));
        assert_eq!(Value::Object(out), json!({"id": "1", "name": "Dev"}));
    }

    #[test]
    fn test_apply_nested_paths() {
        let projection = Projection::of(["location.state", "location.city"]);
        let out = projection.apply(doc(json!({
            "id": "1",
            "location": {"state": "MA", "city": "Boston", "zipcode": "02118"}
        })));
        assert_eq!(
            Value::Object(out),
            json!({"id": "1", "location": {"state": "MA", "city": "Boston"}})
        );
    }

    #[test]
    fn test_includes() {
        let projection = Projection::of(["name", "location.state"]);
        assert!(projection.includes("name"));
        assert!(projection.includes("id"));
        assert!(projection.includes("location"));
        assert!(!projection.includes("courses"));
        assert!(!projection.includes("nam"));
        assert!(Projection::all().includes("courses"));
    }

    #[test]
    fn test_compile_defaults_sort() {
        let compiled = compile(&ParsedQuery::default()).unwrap();
        assert_eq!(compiled.sort.len(), 1);
        assert_eq!(compiled.sort[0].field, "createdAt");
        assert_eq!(compiled.sort[0].direction, SortDirection::Descending);
        assert!(compiled.projection.is_all());
    }
}
