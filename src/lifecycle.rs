//! Parent/child relationship lifecycle.
//!
//! Children are never stored on the parent. The reverse view is a fresh
//! lookup by foreign key, and deleting a parent removes its cascading
//! children first, then the parent, reporting exactly which step failed.

use std::sync::Arc;

use crate::errors::{ApiError, CascadeStage};
use crate::filtering::FilterPredicate;
use crate::resources::{Relation, RelationKind, ResourceDef};
use crate::store::{Document, DocumentStore, FindQuery};

/// Result of a completed cascade delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub parent_id: String,
    /// Children removed across every cascading relation.
    pub children_deleted: u64,
}

#[derive(Clone)]
pub struct RelationshipLifecycle {
    store: Arc<dyn DocumentStore>,
}

impl RelationshipLifecycle {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Documents whose foreign key points at `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a relation that is not `HasMany`
    /// and a store error when the lookup fails.
    pub async fn children_of(&self, relation: &Relation, parent_id: &str) -> Result<Vec<Document>, ApiError> {
        let RelationKind::HasMany {
            collection,
            foreign_key,
            ..
        } = relation.kind
        else {
            return Err(ApiError::configuration(format!(
                "relation '{}' has no children",
                relation.name
            )));
        };
        let query = FindQuery::filtered(vec![FilterPredicate::eq(foreign_key, parent_id)]);
        Ok(self.store.find(collection, &query).await?)
    }

    /// Delete a document together with the children of its cascading relations.
    ///
    /// # Errors
    ///
    /// - `NotFound` when no such document exists; nothing is touched.
    /// - `CascadeIntegrity` with stage `Children` when removing children
    ///   fails; the parent is left in place.
    /// - `CascadeIntegrity` with stage `Parent` when the children are gone
    ///   but the parent could not be removed.
    pub async fn delete_with_children(&self, resource: &ResourceDef, id: &str) -> Result<CascadeOutcome, ApiError> {
        let collection = resource.collection;
        if self.store.find_by_id(collection, id).await?.is_none() {
            return Err(ApiError::not_found(resource.singular, Some(id.to_string())));
        }

        let mut children_deleted = 0;
        for relation in resource.cascading() {
            let RelationKind::HasMany {
                collection: child_collection,
                foreign_key,
                ..
            } = relation.kind
            else {
                continue;
            };
            let filters = [FilterPredicate::eq(foreign_key, id)];
            match self.store.delete_many(child_collection, &filters).await {
                Ok(removed) => {
                    tracing::debug!(collection, id, child_collection, removed, "Removed children");
                    children_deleted += removed;
                }
                Err(source) => {
                    return Err(ApiError::CascadeIntegrity {
                        resource: resource.singular.to_string(),
                        id: id.to_string(),
                        stage: CascadeStage::Children {
                            collection: child_collection.to_string(),
                        },
                        children_deleted,
                        source,
                    });
                }
            }
        }

        match self.store.delete_by_id(collection, id).await {
            Ok(true) => {}
            // Removed concurrently after the existence check.
            Ok(false) => {
                tracing::warn!(collection, id, "Parent vanished during cascade delete");
            }
            Err(source) => {
                return Err(ApiError::CascadeIntegrity {
                    resource: resource.singular.to_string(),
                    id: id.to_string(),
                    stage: CascadeStage::Parent,
                    children_deleted,
                    source,
                });
            }
        }

        tracing::info!(collection, id, children_deleted, "Cascade delete complete");
        Ok(CascadeOutcome {
            parent_id: id.to_string(),
            children_deleted,
        })
    }
}
