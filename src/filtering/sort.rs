use super::query_parser::is_valid_field_name;
use crate::errors::ApiError;
use crate::store::CREATED_AT_FIELD;

/// Field used when a request does not ask for an order.
pub const DEFAULT_SORT_FIELD: &str = CREATED_AT_FIELD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Newest first.
#[must_use]
pub fn default_sort() -> Vec<SortKey> {
    vec![SortKey::desc(DEFAULT_SORT_FIELD)]
}

/// Parse a `sort` value such as `-averageCost,name` into ordered keys.
///
/// A leading `-` sorts descending. Absent or blank input gives
/// [`default_sort`].
///
/// # Errors
///
/// Returns a validation error when a key names an invalid field.
pub fn parse_sorting(sort: Option<&str>) -> Result<Vec<SortKey>, ApiError> {
    let mut keys = Vec::new();
    for raw in sort.unwrap_or_default().split(',').map(str::trim) {
        if raw.is_empty() {
            continue;
        }
        let key = match raw.strip_prefix('-') {
            Some(field) => SortKey::desc(field),
            None => SortKey::asc(raw.strip_prefix('+').unwrap_or(raw)),
        };
        if !is_valid_field_name(&key.field) {
            return Err(ApiError::validation(format!(
                "Invalid sort field '{}'",
                key.field
            )));
        }
        keys.push(key);
    }

    if keys.is_empty() {
        return Ok(default_sort());
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sort_is_newest_first() {
        assert_eq!(parse_sorting(None).unwrap(), vec![SortKey::desc("createdAt")]);
        assert_eq!(parse_sorting(Some(" , ")).unwrap(), vec![SortKey::desc("createdAt")]);
    }

    #[test]
    fn test_multiple_keys_keep_order() {
        let keys = parse_sorting(Some("-averageCost,name")).unwrap();
        assert_eq!(keys, vec![SortKey::desc("averageCost"), SortKey::asc("name")]);
    }

    #[test]
    fn test_rejects_invalid_fields() {
        assert!(parse_sorting(Some("-")).is_err());
        assert!(parse_sorting(Some("name;drop")).is_err());
        assert!(parse_sorting(Some("--name")).is_err());
    }
}
