//! Single-level relationship population.
//!
//! A [`PopulationSpec`] names a relation declared on a resource and the
//! projection of the related documents. Binding it against the resource
//! happens once, when routes are built; applying it costs one batched store
//! lookup per page of results.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::errors::ApiError;
use crate::filtering::{FilterPredicate, Projection};
use crate::resources::{Relation, RelationKind, ResourceDef};
use crate::store::{Document, DocumentStore, FindQuery, ID_FIELD, StoreError, document_id};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationSpec {
    pub relation: String,
    pub projection: Projection,
}

/// A population checked against its resource's relations.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundPopulation {
    relation: &'static Relation,
    projection: Projection,
}

impl BoundPopulation {
    /// # Errors
    ///
    /// Returns a configuration error when `resource` declares no relation
    /// named `spec.relation`.
    pub fn bind(resource: &ResourceDef, spec: &PopulationSpec) -> Result<Self, ApiError> {
        let relation = resource.relation(&spec.relation).ok_or_else(|| {
            ApiError::configuration(format!(
                "cannot populate unknown relation '{}' on {}",
                spec.relation, resource.collection
            ))
        })?;
        Ok(Self {
            relation,
            projection: spec.projection.clone(),
        })
    }

    /// Field the related documents are embedded under.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.relation.name
    }

    /// Embed the related documents into `docs`.
    ///
    /// # Errors
    ///
    /// Propagates the store failure of the batched lookup.
    pub async fn apply(&self, store: &dyn DocumentStore, docs: &mut [Document]) -> Result<(), StoreError> {
        if docs.is_empty() {
            return Ok(());
        }
        match self.relation.kind {
            RelationKind::HasMany {
                collection,
                foreign_key,
                ..
            } => self.embed_children(store, docs, collection, foreign_key).await,
            RelationKind::BelongsTo {
                collection,
                foreign_key,
            } => self.embed_parent(store, docs, collection, foreign_key).await,
        }
    }

    async fn embed_children(
        &self,
        store: &dyn DocumentStore,
        docs: &mut [Document],
        collection: &str,
        foreign_key: &str,
    ) -> Result<(), StoreError> {
        let ids: Vec<Value> = docs
            .iter()
            .filter_map(|doc| document_id(doc).map(|id| Value::String(id.to_string())))
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        // The foreign key is needed for grouping even when not selected.
        let strip_key = !self.projection.includes(foreign_key);
        let query = FindQuery {
            projection: if self.projection.is_all() {
                Projection::all()
            } else {
                self.projection.clone().with_field(foreign_key)
            },
            ..FindQuery::filtered(vec![FilterPredicate::is_in(foreign_key, ids)])
        };

        let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
        for mut child in store.find(collection, &query).await? {
            let Some(parent_id) = child.get(foreign_key).and_then(Value::as_str).map(str::to_string) else {
                continue;
            };
            if strip_key {
                child.remove(foreign_key);
            }
            grouped.entry(parent_id).or_default().push(Value::Object(child));
        }

        for doc in docs.iter_mut() {
            let children = document_id(doc)
                .and_then(|id| grouped.remove(id))
                .unwrap_or_default();
            doc.insert(self.relation.name.to_string(), Value::Array(children));
        }
        Ok(())
    }

    async fn embed_parent(
        &self,
        store: &dyn DocumentStore,
        docs: &mut [Document],
        collection: &str,
        foreign_key: &str,
    ) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        let keys: Vec<Value> = docs
            .iter()
            .filter_map(|doc| doc.get(foreign_key).and_then(Value::as_str))
            .filter(|key| seen.insert(key.to_string()))
            .map(|key| Value::String(key.to_string()))
            .collect();
        if keys.is_empty() {
            return Ok(());
        }

        let query = FindQuery {
            projection: self.projection.clone(),
            ..FindQuery::filtered(vec![FilterPredicate::is_in(ID_FIELD, keys)])
        };
        let parents: HashMap<String, Document> = store
            .find(collection, &query)
            .await?
            .into_iter()
            .filter_map(|parent| document_id(&parent).map(str::to_string).map(|id| (id, parent)))
            .collect();

        for doc in docs.iter_mut() {
            let Some(key) = doc.get(foreign_key).and_then(Value::as_str) else {
                continue;
            };
            let embedded = parents
                .get(key)
                .cloned()
                .map_or(Value::Null, Value::Object);
            doc.insert(self.relation.name.to_string(), embedded);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{COURSES, PROGRAMS, USERS};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn spec(relation: &str, fields: &[&str]) -> PopulationSpec {
        PopulationSpec {
            relation: relation.to_string(),
            projection: Projection::of(fields.iter().copied()),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, name) in [("p1", "Devworks"), ("p2", "ModernTech")] {
            store
                .insert("programs", doc(json!({"id": id, "name": name, "description": "d", "averageCost": 1})))
                .await
                .unwrap();
        }
        for (id, title, program) in [("c1", "Web", "p1"), ("c2", "Mobile", "p1"), ("c3", "Data", "p2"), ("c4", "Orphan", "gone")] {
            store
                .insert("courses", doc(json!({"id": id, "title": title, "weeks": 8, "program": program})))
                .await
                .unwrap();
        }
        store
    }

    #[test]
    fn test_unknown_relation_fails_to_bind() {
        let err = BoundPopulation::bind(&PROGRAMS, &spec("lessons", &[])).unwrap_err();
        assert!(err.to_string().contains("lessons"));
        assert!(BoundPopulation::bind(&USERS, &spec("courses", &[])).is_err());
    }

    #[tokio::test]
    async fn test_has_many_groups_children() {
        let store = seeded().await;
        let population = BoundPopulation::bind(&PROGRAMS, &spec("courses", &["title"])).unwrap();
        let mut docs = vec![doc(json!({"id": "p1"})), doc(json!({"id": "p2"})), doc(json!({"id": "p3"}))];
        population.apply(&store, &mut docs).await.unwrap();

        assert_eq!(
            docs[0]["courses"],
            json!([{"id": "c1", "title": "Web"}, {"id": "c2", "title": "Mobile"}])
        );
        assert_eq!(docs[1]["courses"], json!([{"id": "c3", "title": "Data"}]));
        assert_eq!(docs[2]["courses"], json!([]));
    }

    #[tokio::test]
    async fn test_belongs_to_replaces_key() {
        let store = seeded().await;
        let population = BoundPopulation::bind(&COURSES, &spec("program", &["name"])).unwrap();
        let mut docs = vec![
            doc(json!({"id": "c1", "program": "p1"})),
            doc(json!({"id": "c3", "program": "p2"})),
            doc(json!({"id": "c4", "program": "gone"})),
            doc(json!({"id": "c5"})),
        ];
        population.apply(&store, &mut docs).await.unwrap();

        assert_eq!(docs[0]["program"], json!({"id": "p1", "name": "Devworks"}));
        assert_eq!(docs[1]["program"], json!({"id": "p2", "name": "ModernTech"}));
        assert_eq!(docs[2]["program"], Value::Null);
        assert!(!docs[3].contains_key("program"));
    }

    #[tokio::test]
    async fn test_empty_page_skips_lookup() {
        let store = MemoryStore::new();
        let population = BoundPopulation::bind(&PROGRAMS, &spec("courses", &[])).unwrap();
        let mut docs: Vec<Document> = Vec::new();
        population.apply(&store, &mut docs).await.unwrap();
        assert!(docs.is_empty());
    }
}
