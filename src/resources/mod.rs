//! Static resource definitions.
//!
//! Each resource type is declared once as a [`ResourceDef`]: its collection,
//! the declared types of its filterable fields, its relations, which
//! relation list and single-document responses populate, and how request
//! bodies are validated and enriched. Routes and operations are generic
//! over these definitions.

pub mod courses;
pub mod programs;
pub mod reviews;
pub mod users;

use serde_json::Value;

use crate::filtering::{FieldKind, Projection};
use crate::results::populate::PopulationSpec;
use crate::store::Document;
use crate::validation::ValidateFn;

pub use courses::COURSES;
pub use programs::PROGRAMS;
pub use reviews::REVIEWS;
pub use users::USERS;

/// Every resource served by the API, in route order.
pub static ALL: [&ResourceDef; 4] = [&PROGRAMS, &COURSES, &REVIEWS, &USERS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Children in `collection` point back here through `foreign_key`.
    HasMany {
        collection: &'static str,
        foreign_key: &'static str,
        /// Delete the children together with the parent.
        cascade: bool,
    },
    /// This document's `foreign_key` field holds the id of a `collection` document.
    BelongsTo {
        collection: &'static str,
        foreign_key: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Field the related document(s) are embedded under.
    pub name: &'static str,
    pub kind: RelationKind,
}

/// A population binding declared on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationDef {
    pub relation: &'static str,
    /// Projection of the related documents; empty means every field.
    pub select: &'static [&'static str],
}

impl PopulationDef {
    #[must_use]
    pub fn spec(&self) -> PopulationSpec {
        PopulationSpec {
            relation: self.relation.to_string(),
            projection: Projection::of(self.select.iter().copied()),
        }
    }
}

/// Value filled in on create when the body omits the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Bool(bool),
    Text(&'static str),
}

impl DefaultValue {
    #[must_use]
    pub fn to_json(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Text(s) => Value::String(s.to_string()),
        }
    }
}

/// Replace a free-form address with a geocoded location on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeocodeRule {
    pub address_field: &'static str,
    pub location_field: &'static str,
}

#[derive(Debug)]
pub struct ResourceDef {
    pub collection: &'static str,
    /// Display name used in messages ("Program").
    pub singular: &'static str,
    pub fields: &'static [(&'static str, FieldKind)],
    pub relations: &'static [Relation],
    /// Population applied to list responses.
    pub list_population: Option<PopulationDef>,
    /// Population applied to single-document responses.
    pub item_population: Option<PopulationDef>,
    pub validate: ValidateFn,
    pub defaults: &'static [(&'static str, DefaultValue)],
    /// Field the `slug` is derived from.
    pub slug_source: Option<&'static str>,
    pub unique_fields: &'static [&'static str],
    pub geocode: Option<GeocodeRule>,
}

impl ResourceDef {
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        let relations: &'static [Relation] = self.relations;
        relations.iter().find(|relation| relation.name == name)
    }

    /// Relations whose children go with the parent on delete.
    pub fn cascading(&self) -> impl Iterator<Item = &'static Relation> + use<> {
        let relations: &'static [Relation] = self.relations;
        relations.iter().filter(|relation| {
            matches!(relation.kind, RelationKind::HasMany { cascade: true, .. })
        })
    }

    pub fn belongs_to(&self) -> impl Iterator<Item = (&'static str, &'static str)> + use<> {
        let relations: &'static [Relation] = self.relations;
        relations.iter().filter_map(|relation| match relation.kind {
            RelationKind::BelongsTo {
                collection,
                foreign_key,
            } => Some((collection, foreign_key)),
            RelationKind::HasMany { .. } => None,
        })
    }

    pub fn apply_defaults(&self, doc: &mut Document) {
        for (field, default) in self.defaults {
            if !doc.contains_key(*field) {
                doc.insert((*field).to_string(), default.to_json());
            }
        }
    }
}

/// Look a resource up by its collection name.
#[must_use]
pub fn by_collection(collection: &str) -> Option<&'static ResourceDef> {
    ALL.iter().copied().find(|resource| resource.collection == collection)
}

/// Lowercase, hyphen-separated form of `text` (`"Devworks Bootcamp"` → `"devworks-bootcamp"`).
#[must_use]
pub fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
