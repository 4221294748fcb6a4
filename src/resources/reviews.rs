use super::{PopulationDef, Relation, RelationKind, ResourceDef};
use crate::filtering::FieldKind;
use crate::store::Document;
use crate::validation::{DocumentValidator, ValidationErrors, ValidationMode};

pub static REVIEWS: ResourceDef = ResourceDef {
    collection: "reviews",
    singular: "Review",
    fields: &[
        ("title", FieldKind::Text),
        ("text", FieldKind::Text),
        ("rating", FieldKind::Number),
        ("program", FieldKind::Text),
        ("user", FieldKind::Text),
        ("createdAt", FieldKind::Date),
    ],
    relations: &[
        Relation {
            name: "program",
            kind: RelationKind::BelongsTo {
                collection: "programs",
                foreign_key: "program",
            },
        },
        Relation {
            name: "user",
            kind: RelationKind::BelongsTo {
                collection: "users",
                foreign_key: "user",
            },
        },
    ],
    list_population: Some(PopulationDef {
        relation: "program",
        select: &["name", "description"],
    }),
    item_population: Some(PopulationDef {
        relation: "program",
        select: &["name", "description"],
    }),
    validate: validate_review,
    defaults: &[],
    slug_source: None,
    unique_fields: &[],
    geocode: None,
};

fn validate_review(doc: &Document, mode: ValidationMode) -> Result<(), ValidationErrors> {
    DocumentValidator::new(doc, mode)
        .required_string("title", Some(100))
        .required_string("text", None)
        .number_range("rating", Some(1.0), Some(10.0), true)
        .required_string("program", None)
        .string("user", None, false)
        .finish()
}
