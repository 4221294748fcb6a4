//! Document storage.
//!
//! Resources are stored as JSON documents grouped by collection. Every
//! backend implements [`DocumentStore`]; handlers only ever hold an
//! `Arc<dyn DocumentStore>`.

pub mod memory;
pub mod sql;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sea_orm::DbErr;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::filtering::{FilterPredicate, Projection, SortKey};
use crate::geo::RadiusQuery;

pub use memory::MemoryStore;
pub use sql::SqlDocumentStore;

/// A stored document.
pub type Document = Map<String, Value>;

/// Identity field, assigned on insert.
pub const ID_FIELD: &str = "id";

/// Creation timestamp field, assigned on insert.
pub const CREATED_AT_FIELD: &str = "createdAt";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored document {id} in '{collection}' is not a JSON object")]
    Corrupt { collection: String, id: String },

    #[error("{0}")]
    Backend(String),
}

/// Parameters of a windowed find.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filters: Vec<FilterPredicate>,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    /// `None` returns every match.
    pub limit: Option<u64>,
    pub projection: Projection,
}

impl FindQuery {
    #[must_use]
    pub fn filtered(filters: Vec<FilterPredicate>) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Number of documents matching every filter.
    async fn count(&self, collection: &str, filters: &[FilterPredicate]) -> Result<u64, StoreError>;

    /// Matching documents, sorted, windowed and projected.
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Documents whose GeoJSON point at `field` lies inside `radius`.
    async fn find_within(
        &self,
        collection: &str,
        field: &str,
        radius: &RadiusQuery,
    ) -> Result<Vec<Document>, StoreError>;

    /// Store a new document, assigning `id` and `createdAt` when absent.
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError>;

    /// Shallow-merge `changes` into a document. `id` and `createdAt` never change.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError>;

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Delete every match, returning how many were removed.
    async fn delete_many(
        &self,
        collection: &str,
        filters: &[FilterPredicate],
    ) -> Result<u64, StoreError>;
}

/// Current time in the stored `createdAt` format.
///
/// Fixed microsecond precision keeps lexical and chronological order equal.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Fill in `id` and `createdAt` on a document about to be inserted.
#[must_use]
pub fn prepare_new_document(mut doc: Document) -> Document {
    if !matches!(doc.get(ID_FIELD), Some(Value::String(id)) if !id.is_empty()) {
        doc.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    if !matches!(doc.get(CREATED_AT_FIELD), Some(Value::String(_))) {
        doc.insert(CREATED_AT_FIELD.to_string(), Value::String(now_timestamp()));
    }
    doc
}

/// Apply an update body, ignoring attempts to change managed fields.
pub fn merge_changes(doc: &mut Document, changes: Document) {
    for (key, value) in changes {
        if key == ID_FIELD || key == CREATED_AT_FIELD {
            continue;
        }
        doc.insert(key, value);
    }
}

/// Follow a dotted path (`location.state`) into a document.
#[must_use]
pub fn resolve_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// The document's id, if it has a string one.
#[must_use]
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}
