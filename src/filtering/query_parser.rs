//! Query-string parsing for list endpoints.
//!
//! Turns the raw `?key=value` pairs of a request into a [`ParsedQuery`]: the
//! reserved control keys (`select`, `sort`, `page`, `limit`) are set aside
//! and every other key becomes a typed [`FilterPredicate`].
//!
//! ```text
//! averageCost[lte]=10000&housing=true&careers[in]=Business,Other&select=name&page=2
//! ```

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde_json::{Number, Value};
use std::convert::Infallible;

use super::conditions::FilterPredicate;
use super::operators::ComparisonOperator;
use crate::errors::ApiError;

/// Control keys that never become filters.
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Maximum length of a field name (prevents `DoS` via huge keys).
pub const MAX_FIELD_NAME_LENGTH: usize = 100;

/// Maximum length of a single filter value.
pub const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

/// Declared type of a filterable field, used to coerce query-string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    /// RFC 3339 timestamps, compared lexically.
    Date,
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Value),
    List(Vec<Value>),
}

/// Ordered query-string pairs of one request.
///
/// A repeated key keeps the position of its first occurrence and the value
/// of its last one, so `?sort=name&sort=-name` sorts by `-name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pairs: Vec<(String, String)>,
}

impl QueryRequest {
    /// Parse a raw (still percent-encoded) query string.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut deduped: Vec<(String, String)> = Vec::new();
        for (key, value) in pairs {
            let (key, value) = (key.into(), value.into());
            if let Some(existing) = deduped.iter_mut().find(|(k, _)| *k == key) {
                existing.1 = value;
            } else {
                deduped.push((key, value));
            }
        }
        Self { pairs: deduped }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<S> FromRequestParts<S> for QueryRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.uri.query().map(Self::parse).unwrap_or_default())
    }
}

/// The decomposed query, before compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub filters: Vec<FilterPredicate>,
    pub select: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Validate a field name used in filters, projections or sort keys.
///
/// Dotted paths (`location.state`) are allowed; a leading `_`, `.` or `-`,
/// `..`, and anything outside `[A-Za-z0-9_.-]` are not, which also rules out
/// `$` operator injection.
#[must_use]
pub fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_FIELD_NAME_LENGTH
        && !name.starts_with(['_', '.', '-'])
        && !name.ends_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Split `field[op]` into the field and its operator. A bare key is equality.
///
/// # Errors
///
/// Returns a validation error for malformed brackets, unknown operator tokens
/// or invalid field names.
pub fn split_filter_key(key: &str) -> Result<(&str, ComparisonOperator), ApiError> {
    let (field, operator) = match key.find('[') {
        None => {
            if key.contains(']') {
                return Err(ApiError::validation(format!("Malformed filter key '{key}'")));
            }
            (key, ComparisonOperator::Eq)
        }
        Some(open) => {
            let field = &key[..open];
            let rest = &key[open + 1..];
            let Some(token) = rest.strip_suffix(']') else {
                return Err(ApiError::validation(format!("Malformed filter key '{key}'")));
            };
            if token.is_empty() || token.contains(['[', ']']) {
                return Err(ApiError::validation(format!("Malformed filter key '{key}'")));
            }
            let operator = ComparisonOperator::from_token(token).ok_or_else(|| {
                ApiError::validation(format!(
                    "Unsupported filter operator '{token}' on '{field}'; expected one of {}",
                    ComparisonOperator::supported_tokens()
                ))
            })?;
            (field, operator)
        }
    };

    if !is_valid_field_name(field) {
        return Err(ApiError::validation(format!("Invalid field name '{field}'")));
    }
    Ok((field, operator))
}

fn coerce(field: &str, raw: &str, kind: Option<FieldKind>) -> Result<Value, ApiError> {
    match kind {
        Some(FieldKind::Number) => {
            if let Ok(int) = raw.parse::<i64>() {
                return Ok(Value::Number(int.into()));
            }
            raw.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| {
                    ApiError::validation(format!("Value '{raw}' for '{field}' is not a number"))
                })
        }
        Some(FieldKind::Boolean) => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ApiError::validation(format!(
                "Value '{raw}' for '{field}' must be true or false"
            ))),
        },
        Some(FieldKind::Text | FieldKind::Date) | None => Ok(Value::String(raw.to_string())),
    }
}

fn kind_of(fields: &[(&str, FieldKind)], field: &str) -> Option<FieldKind> {
    fields
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, kind)| *kind)
}

/// Decompose a request into filters and control values.
///
/// `fields` declares the coercion type of known fields; unknown fields are
/// compared as strings.
///
/// # Errors
///
/// Returns a validation error for any malformed key, unsupported operator,
/// oversized value, empty `in` list or value that fails coercion.
pub fn parse_query(
    request: &QueryRequest,
    fields: &[(&str, FieldKind)],
) -> Result<ParsedQuery, ApiError> {
    let mut parsed = ParsedQuery::default();

    for (key, raw) in request.iter() {
        match key {
            "select" => parsed.select = Some(raw.to_string()),
            "sort" => parsed.sort = Some(raw.to_string()),
            "page" => parsed.page = Some(raw.to_string()),
            "limit" => parsed.limit = Some(raw.to_string()),
            _ => {
                let (field, operator) = split_filter_key(key)?;
                if raw.len() > MAX_FIELD_VALUE_LENGTH {
                    return Err(ApiError::validation(format!(
                        "Value for '{field}' exceeds {MAX_FIELD_VALUE_LENGTH} characters"
                    )));
                }
                let kind = kind_of(fields, field);
                let value = if operator.takes_list() {
                    let items = raw
                        .split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(|item| coerce(field, item, kind))
                        .collect::<Result<Vec<_>, _>>()?;
                    if items.is_empty() {
                        return Err(ApiError::validation(format!(
                            "Filter '{field}[in]' needs at least one value"
                        )));
                    }
                    FilterValue::List(items)
                } else {
                    FilterValue::Scalar(coerce(field, raw, kind)?)
                };
                parsed.filters.push(FilterPredicate {
                    field: field.to_string(),
                    operator,
                    value,
                });
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[(&str, FieldKind)] = &[
        ("averageCost", FieldKind::Number),
        ("housing", FieldKind::Boolean),
        ("careers", FieldKind::Text),
        ("createdAt", FieldKind::Date),
    ];

    #[test]
    fn test_reserved_keys_are_not_filters() {
        let request = QueryRequest::parse("select=name,description&sort=-averageCost&page=2&limit=5");
        let parsed = parse_query(&request, FIELDS).unwrap();
        assert!(parsed.filters.is_empty());
        assert_eq!(parsed.select.as_deref(), Some("name,description"));
        assert_eq!(parsed.sort.as_deref(), Some("-averageCost"));
        assert_eq!(parsed.page.as_deref(), Some("2"));
        assert_eq!(parsed.limit.as_deref(), Some("5"));
    }

    #[test]
    fn test_bracketed_operators_and_coercion() {
        let request = QueryRequest::parse("averageCost%5Bgte%5D=5000&averageCost[lte]=10000.5&housing=true");
        let parsed = parse_query(&request, FIELDS).unwrap();
        assert_eq!(
            parsed.filters,
            vec![
                FilterPredicate {
                    field: "averageCost".into(),
                    operator: ComparisonOperator::Gte,
                    value: FilterValue::Scalar(json!(5000)),
                },
                FilterPredicate {
                    field: "averageCost".into(),
                    operator: ComparisonOperator::Lte,
                    value: FilterValue::Scalar(json!(10000.5)),
                },
                FilterPredicate {
                    field: "housing".into(),
                    operator: ComparisonOperator::Eq,
                    value: FilterValue::Scalar(json!(true)),
                },
            ]
        );
    }

    #[test]
    fn test_in_list_is_split_and_trimmed() {
        let request = QueryRequest::parse("careers[in]=Business,%20Other,,");
        let parsed = parse_query(&request, FIELDS).unwrap();
        assert_eq!(
            parsed.filters[0].value,
            FilterValue::List(vec![json!("Business"), json!("Other")])
        );
    }

    #[test]
    fn test_empty_in_list_is_rejected() {
        let request = QueryRequest::parse("careers[in]=,,");
        assert!(parse_query(&request, FIELDS).is_err());
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let request = QueryRequest::parse("averageCost[neq]=5");
        let err = parse_query(&request, FIELDS).unwrap_err();
        let message = err.user_message();
        assert!(message.contains("neq"));
        assert!(message.contains("gt, gte, lt, lte, in"));
    }

    #[test]
    fn test_malformed_brackets_are_rejected() {
        for key in ["cost[", "cost]", "cost[]", "cost[gt][lt]", "[gt]", "cost[gt]x"] {
            let request = QueryRequest::from_pairs([(key, "1")]);
            assert!(parse_query(&request, FIELDS).is_err(), "{key} should be rejected");
        }
    }

    #[test]
    fn test_operator_injection_is_rejected() {
        for key in ["$where", "cost.$gt", "_id", "a..b", ".a"] {
            let request = QueryRequest::from_pairs([(key, "1")]);
            assert!(parse_query(&request, FIELDS).is_err(), "{key} should be rejected");
        }
    }

    #[test]
    fn test_dotted_paths_are_allowed() {
        let request = QueryRequest::parse("location.state=MA");
        let parsed = parse_query(&request, FIELDS).unwrap();
        assert_eq!(parsed.filters[0].field, "location.state");
        assert_eq!(parsed.filters[0].value, FilterValue::Scalar(json!("MA")));
    }

    #[test]
    fn test_number_coercion_failure() {
        let request = QueryRequest::parse("averageCost[gt]=cheap");
        assert!(parse_query(&request, FIELDS).is_err());
    }

    #[test]
    fn test_boolean_coercion_failure() {
        let request = QueryRequest::parse("housing=yes");
        assert!(parse_query(&request, FIELDS).is_err());
    }

    #[test]
    fn test_unknown_field_stays_string() {
        let request = QueryRequest::parse("website=42");
        let parsed = parse_query(&request, FIELDS).unwrap();
        assert_eq!(parsed.filters[0].value, FilterValue::Scalar(json!("42")));
    }

    #[test]
    fn test_oversized_value_is_rejected() {
        let request = QueryRequest::from_pairs([("careers", "x".repeat(MAX_FIELD_VALUE_LENGTH + 1))]);
        assert!(parse_query(&request, FIELDS).is_err());
    }

    #[test]
    fn test_repeated_key_last_value_wins() {
        let request = QueryRequest::parse("sort=name&housing=true&sort=-name");
        let keys: Vec<_> = request.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["sort", "housing"]);
        assert_eq!(request.get("sort"), Some("-name"));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let request = QueryRequest::parse("averageCost[gte]=1&careers[in]=a,b&sort=name");
        assert_eq!(
            parse_query(&request, FIELDS).unwrap(),
            parse_query(&request, FIELDS).unwrap()
        );
    }
}
