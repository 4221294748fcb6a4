use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::filtering::{PageLinks, PaginationWindow};
use crate::store::Document;

/// Response body of list endpoints.
///
/// `count` is the number of documents in `data`, not the filtered total.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResultEnvelope {
    pub success: bool,
    pub count: u64,
    pub pagination: Option<PageLinks>,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Value>,
}

impl ResultEnvelope {
    /// A page of results with `next`/`prev` links from `window`.
    #[must_use]
    pub fn paged(data: Vec<Document>, window: &PaginationWindow) -> Self {
        Self {
            pagination: Some(window.links()),
            ..Self::unpaged(data)
        }
    }

    /// Results without pagination metadata (radius search, child listings).
    #[must_use]
    pub fn unpaged(data: Vec<Document>) -> Self {
        Self {
            success: true,
            count: data.len() as u64,
            pagination: None,
            data: data.into_iter().map(Value::Object).collect(),
        }
    }
}

/// Response body of single-document endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemEnvelope {
    pub success: bool,
    #[schema(value_type = Object)]
    pub data: Value,
}

impl ItemEnvelope {
    #[must_use]
    pub fn new(doc: Document) -> Self {
        Self {
            success: true,
            data: Value::Object(doc),
        }
    }

    /// `{"success": true, "data": {}}`, returned after deletes.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Document::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paged_envelope_shape() {
        let window = PaginationWindow::compute(Some("1"), Some("10"), 47, 25, 100);
        let mut doc = Document::new();
        doc.insert("id".into(), json!("p1"));
        let envelope = ResultEnvelope::paged(vec![doc], &window);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": true,
                "count": 1,
                "pagination": {"next": {"page": 2, "limit": 10}},
                "data": [{"id": "p1"}]
            })
        );
    }

    #[test]
    fn test_unpaged_envelope_omits_pagination() {
        let envelope = ResultEnvelope::unpaged(Vec::new());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "count": 0, "data": []})
        );
    }

    #[test]
    fn test_empty_item_envelope() {
        assert_eq!(
            serde_json::to_value(ItemEnvelope::empty()).unwrap(),
            json!({"success": true, "data": {}})
        );
    }
}
