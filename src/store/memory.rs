//! In-process document store.
//!
//! Filters are evaluated against `serde_json` documents after retrieval. A
//! predicate on an array field matches when any element matches, and a
//! missing field never matches.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    Document, DocumentStore, FindQuery, StoreError, document_id, merge_changes,
    prepare_new_document, resolve_path,
};
use crate::filtering::{FilterPredicate, FilterValue, SortDirection, SortKey};
use crate::geo::{GeoPoint, RadiusQuery};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compare two JSON values. `None` when the types are not comparable.
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn scalar_matches(actual: &Value, predicate: &FilterPredicate) -> bool {
    match &predicate.value {
        FilterValue::Scalar(expected) => predicate
            .operator
            .accepts(compare_values(actual, expected)),
        FilterValue::List(options) => options
            .iter()
            .any(|option| compare_values(actual, option) == Some(Ordering::Equal)),
    }
}

fn matches_predicate(doc: &Document, predicate: &FilterPredicate) -> bool {
    match resolve_path(doc, &predicate.field) {
        None => false,
        Some(Value::Array(items)) => items.iter().any(|item| scalar_matches(item, predicate)),
        Some(actual) => scalar_matches(actual, predicate),
    }
}

fn matches_all(doc: &Document, filters: &[FilterPredicate]) -> bool {
    filters.iter().all(|predicate| matches_predicate(doc, predicate))
}

/// Cross-type order for sorting: missing/null, numbers, strings, objects,
/// arrays, booleans.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    type_rank(a).cmp(&type_rank(b)).then_with(|| match (a, b) {
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    })
}

/// Stable multi-key sort; ties keep insertion order.
fn sort_documents(docs: &mut [Document], keys: &[SortKey]) {
    docs.sort_by(|a, b| {
        keys.iter().fold(Ordering::Equal, |ordering, key| {
            ordering.then_with(|| {
                let ord = compare_for_sort(resolve_path(a, &key.field), resolve_path(b, &key.field));
                match key.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            })
        })
    });
}

fn window<T>(items: Vec<T>, skip: u64, limit: Option<u64>) -> Vec<T> {
    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let take = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    items.into_iter().skip(skip).take(take).collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, collection: &str, filters: &[FilterPredicate]) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map_or(0, |docs| docs.iter().filter(|doc| matches_all(doc, filters)).count());
        Ok(count as u64)
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let mut matched: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|doc| matches_all(doc, &query.filters))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        sort_documents(&mut matched, &query.sort);
        Ok(window(matched, query.skip, query.limit)
            .into_iter()
            .map(|doc| query.projection.apply(doc))
            .collect())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| document_id(doc) == Some(id)))
            .cloned())
    }

    async fn find_within(
        &self,
        collection: &str,
        field: &str,
        radius: &RadiusQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| {
                        resolve_path(doc, field)
                            .and_then(GeoPoint::from_geojson)
                            .is_some_and(|point| radius.contains(&point))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = prepare_new_document(doc);
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(stored) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| document_id(doc) == Some(id)))
        else {
            return Ok(None);
        };
        merge_changes(stored, changes);
        Ok(Some(stored.clone()))
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| document_id(doc) != Some(id));
        Ok(docs.len() < before)
    }

    async fn delete_many(
        &self,
        collection: &str,
        filters: &[FilterPredicate],
    ) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !matches_all(doc, filters));
        Ok((before - docs.len()) as u64)
    }
}
