//! # Resource Operations
//!
//! Single-document operations shared by every resource. Behavior that
//! differs per resource (validation rules, defaults, slugs, unique fields,
//! geocoded addresses, parent checks) is read from its [`ResourceDef`], so
//! the handlers stay generic.
//!
//! ## Write pipeline
//!
//! 1. Managed fields (`id`, `createdAt`, `slug`) are dropped from the body
//! 2. The resource's validator runs (`Create` or `Update` mode)
//! 3. Defaults and the slug are filled in
//! 4. Unique fields and parent references are checked against the store
//! 5. A free-form address is geocoded into a stored location
//! 6. The document is written, then unique fields are checked again and
//!    the write is undone if a concurrent writer took the same value

use std::sync::Arc;

use serde_json::Value;

use crate::errors::ApiError;
use crate::filtering::FilterPredicate;
use crate::geo::GeoResolver;
use crate::lifecycle::{CascadeOutcome, RelationshipLifecycle};
use crate::resources::{RelationKind, ResourceDef, by_collection, slugify};
use crate::results::BoundPopulation;
use crate::store::{CREATED_AT_FIELD, Document, DocumentStore, FindQuery, ID_FIELD, document_id};
use crate::validation::ValidationMode;

/// Derived from the resource's `slug_source`; never taken from a request.
const SLUG_FIELD: &str = "slug";

#[derive(Clone)]
pub struct ResourceOperations {
    store: Arc<dyn DocumentStore>,
    geo: GeoResolver,
    lifecycle: RelationshipLifecycle,
}

impl ResourceOperations {
    pub fn new(store: Arc<dyn DocumentStore>, geo: GeoResolver) -> Self {
        let lifecycle = RelationshipLifecycle::new(store.clone());
        Self {
            store,
            geo,
            lifecycle,
        }
    }

    #[must_use]
    pub fn lifecycle(&self) -> &RelationshipLifecycle {
        &self.lifecycle
    }

    /// Fetch one document, optionally embedding a relation.
    ///
    /// # Errors
    ///
    /// `NotFound` when no document has this id; store errors otherwise.
    pub async fn get_one(
        &self,
        resource: &ResourceDef,
        id: &str,
        population: Option<&BoundPopulation>,
    ) -> Result<Document, ApiError> {
        let doc = self
            .store
            .find_by_id(resource.collection, id)
            .await?
            .ok_or_else(|| ApiError::not_found(resource.singular, Some(id.to_string())))?;

        let mut docs = [doc];
        if let Some(population) = population {
            population.apply(self.store.as_ref(), &mut docs).await?;
        }
        let [doc] = docs;
        Ok(doc)
    }

    /// Validate, enrich and insert a new document.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` when the body breaks the resource's rules
    /// - `Conflict` when a unique field is already taken
    /// - `NotFound` when a referenced parent does not exist
    /// - geocoding errors when the address cannot be resolved
    pub async fn create(&self, resource: &ResourceDef, mut body: Document) -> Result<Document, ApiError> {
        strip_managed(&mut body);

        (resource.validate)(&body, ValidationMode::Create)?;
        resource.apply_defaults(&mut body);
        Self::assign_slug(resource, &mut body);
        self.ensure_unique(resource, &body, None).await?;
        self.ensure_parents_exist(resource, &body).await?;
        self.geocode_address(resource, &mut body).await?;

        let created = self.store.insert(resource.collection, body).await?;
        let id = document_id(&created).unwrap_or_default();
        if let Some(conflict) = self.unique_rival(resource, &created, true).await? {
            self.store.delete_by_id(resource.collection, id).await?;
            tracing::warn!(collection = resource.collection, id, "Concurrent create lost a unique value");
            return Err(conflict);
        }
        tracing::info!(collection = resource.collection, id, "Document created");
        Ok(created)
    }

    /// Shallow-merge `changes` into an existing document.
    ///
    /// # Errors
    ///
    /// Same as [`ResourceOperations::create`], plus `NotFound` for an unknown id.
    pub async fn update(
        &self,
        resource: &ResourceDef,
        id: &str,
        mut changes: Document,
    ) -> Result<Document, ApiError> {
        strip_managed(&mut changes);

        (resource.validate)(&changes, ValidationMode::Update)?;
        let previous = self
            .store
            .find_by_id(resource.collection, id)
            .await?
            .ok_or_else(|| ApiError::not_found(resource.singular, Some(id.to_string())))?;
        Self::assign_slug(resource, &mut changes);
        self.ensure_unique(resource, &changes, Some(id)).await?;
        self.ensure_parents_exist(resource, &changes).await?;
        self.geocode_address(resource, &mut changes).await?;
        let claims_unique = resource.unique_fields.iter().any(|field| changes.contains_key(*field));

        let updated = self
            .store
            .update(resource.collection, id, changes)
            .await?
            .ok_or_else(|| ApiError::not_found(resource.singular, Some(id.to_string())))?;
        if claims_unique && let Some(conflict) = self.unique_rival(resource, &updated, false).await? {
            self.restore_unique_fields(resource, id, &previous).await?;
            tracing::warn!(collection = resource.collection, id, "Concurrent update lost a unique value");
            return Err(conflict);
        }
        tracing::info!(collection = resource.collection, id, "Document updated");
        Ok(updated)
    }

    /// Delete a document and the children of its cascading relations.
    ///
    /// # Errors
    ///
    /// See [`RelationshipLifecycle::delete_with_children`].
    pub async fn delete(&self, resource: &ResourceDef, id: &str) -> Result<CascadeOutcome, ApiError> {
        self.lifecycle.delete_with_children(resource, id).await
    }

    /// Children reached through `relation` of the parent `parent_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the relation is unknown, not a has-many relation or
    /// the parent is missing.
    pub async fn list_children(
        &self,
        parent: &ResourceDef,
        relation: &str,
        parent_id: &str,
    ) -> Result<Vec<Document>, ApiError> {
        let relation = parent
            .relation(relation)
            .filter(|r| matches!(r.kind, RelationKind::HasMany { .. }))
            .ok_or_else(|| ApiError::not_found(format!("Relation '{relation}'"), None))?;
        self.require_parent(parent, parent_id).await?;
        self.lifecycle.children_of(relation, parent_id).await
    }

    /// Create a child bound to `parent_id` through `relation`.
    ///
    /// Any foreign key given in the body is overwritten by the parent id.
    ///
    /// # Errors
    ///
    /// `NotFound` when the relation is unknown, not a has-many relation or
    /// the parent is missing; otherwise as [`ResourceOperations::create`].
    pub async fn create_child(
        &self,
        parent: &ResourceDef,
        relation: &str,
        parent_id: &str,
        mut body: Document,
    ) -> Result<Document, ApiError> {
        let Some(RelationKind::HasMany {
            collection,
            foreign_key,
            ..
        }) = parent.relation(relation).map(|r| r.kind)
        else {
            return Err(ApiError::not_found(format!("Relation '{relation}'"), None));
        };
        let child = by_collection(collection)
            .ok_or_else(|| ApiError::configuration(format!("no resource serves '{collection}'")))?;

        self.require_parent(parent, parent_id).await?;
        body.insert(foreign_key.to_string(), Value::String(parent_id.to_string()));
        self.create(child, body).await
    }

    async fn require_parent(&self, parent: &ResourceDef, parent_id: &str) -> Result<(), ApiError> {
        if self.store.find_by_id(parent.collection, parent_id).await?.is_none() {
            return Err(ApiError::not_found(parent.singular, Some(parent_id.to_string())));
        }
        Ok(())
    }

    fn assign_slug(resource: &ResourceDef, body: &mut Document) {
        if let Some(source) = resource.slug_source
            && let Some(Value::String(text)) = body.get(source)
        {
            let slug = slugify(text);
            body.insert(SLUG_FIELD.to_string(), Value::String(slug));
        }
    }

    async fn ensure_unique(
        &self,
        resource: &ResourceDef,
        body: &Document,
        current_id: Option<&str>,
    ) -> Result<(), ApiError> {
        for field in resource.unique_fields {
            let Some(text) = body.get(*field).and_then(Value::as_str) else {
                continue;
            };
            let taken = self
                .holders(resource, field, text)
                .await?
                .iter()
                .any(|existing| document_id(existing) != current_id);
            if taken {
                return Err(unique_conflict(resource, field, text));
            }
        }
        Ok(())
    }

    /// Up to two documents holding `text` in `field`, oldest first.
    async fn holders(&self, resource: &ResourceDef, field: &str, text: &str) -> Result<Vec<Document>, ApiError> {
        let query = FindQuery {
            limit: Some(2),
            ..FindQuery::filtered(vec![FilterPredicate::eq(field, text)])
        };
        Ok(self.store.find(resource.collection, &query).await?)
    }

    /// Conflict for the first unique value of the written `doc` that another
    /// document also holds. With `earlier_only`, only an older holder counts:
    /// of several concurrent creates, the first one inserted keeps the value.
    async fn unique_rival(
        &self,
        resource: &ResourceDef,
        doc: &Document,
        earlier_only: bool,
    ) -> Result<Option<ApiError>, ApiError> {
        let id = document_id(doc);
        for field in resource.unique_fields {
            let Some(text) = doc.get(*field).and_then(Value::as_str) else {
                continue;
            };
            let holders = self.holders(resource, field, text).await?;
            let rival = if earlier_only {
                holders.first().is_some_and(|first| document_id(first) != id)
            } else {
                holders.iter().any(|holder| document_id(holder) != id)
            };
            if rival {
                return Ok(Some(unique_conflict(resource, field, text)));
            }
        }
        Ok(None)
    }

    async fn restore_unique_fields(
        &self,
        resource: &ResourceDef,
        id: &str,
        previous: &Document,
    ) -> Result<(), ApiError> {
        let derived = resource.slug_source.map(|_| SLUG_FIELD);
        let mut restore = Document::new();
        for field in resource.unique_fields.iter().copied().chain(derived) {
            if let Some(value) = previous.get(field) {
                restore.insert(field.to_string(), value.clone());
            }
        }
        if !restore.is_empty() {
            self.store.update(resource.collection, id, restore).await?;
        }
        Ok(())
    }

    async fn ensure_parents_exist(&self, resource: &ResourceDef, body: &Document) -> Result<(), ApiError> {
        for (collection, foreign_key) in resource.belongs_to() {
            let Some(Value::String(parent_id)) = body.get(foreign_key) else {
                continue;
            };
            if self.store.find_by_id(collection, parent_id).await?.is_none() {
                let singular = by_collection(collection).map_or(collection, |parent| parent.singular);
                return Err(ApiError::not_found(singular, Some(parent_id.clone())));
            }
        }
        Ok(())
    }

    async fn geocode_address(&self, resource: &ResourceDef, body: &mut Document) -> Result<(), ApiError> {
        let Some(rule) = resource.geocode else {
            return Ok(());
        };
        let Some(Value::String(address)) = body.remove(rule.address_field) else {
            return Ok(());
        };
        let location = self.geo.locate(&address).await?;
        body.insert(rule.location_field.to_string(), Value::Object(location));
        Ok(())
    }
}

fn strip_managed(body: &mut Document) {
    body.remove(ID_FIELD);
    body.remove(CREATED_AT_FIELD);
    body.remove(SLUG_FIELD);
}

fn unique_conflict(resource: &ResourceDef, field: &str, text: &str) -> ApiError {
    ApiError::conflict(format!("{} with {field} '{text}' already exists", resource.singular))
}
