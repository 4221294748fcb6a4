use super::{DefaultValue, GeocodeRule, PopulationDef, Relation, RelationKind, ResourceDef};
use crate::filtering::FieldKind;
use crate::store::Document;
use crate::validation::{DocumentValidator, ValidationErrors, ValidationMode};

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub static PROGRAMS: ResourceDef = ResourceDef {
    collection: "programs",
    singular: "Program",
    fields: &[
        ("name", FieldKind::Text),
        ("slug", FieldKind::Text),
        ("description", FieldKind::Text),
        ("website", FieldKind::Text),
        ("phone", FieldKind::Text),
        ("email", FieldKind::Text),
        ("careers", FieldKind::Text),
        ("averageRating", FieldKind::Number),
        ("averageCost", FieldKind::Number),
        ("photo", FieldKind::Text),
        ("housing", FieldKind::Boolean),
        ("jobAssistance", FieldKind::Boolean),
        ("jobGuarantee", FieldKind::Boolean),
        ("acceptGi", FieldKind::Boolean),
        ("location.city", FieldKind::Text),
        ("location.state", FieldKind::Text),
        ("location.zipcode", FieldKind::Text),
        ("location.country", FieldKind::Text),
        ("user", FieldKind::Text),
        ("createdAt", FieldKind::Date),
    ],
    relations: &[
        Relation {
            name: "courses",
            kind: RelationKind::HasMany {
                collection: "courses",
                foreign_key: "program",
                cascade: true,
            },
        },
        Relation {
            name: "reviews",
            kind: RelationKind::HasMany {
                collection: "reviews",
                foreign_key: "program",
                cascade: true,
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
        relation: "courses",
        select: &[],
    }),
    item_population: Some(PopulationDef {
        relation: "courses",
        select: &["title", "weeks", "tuition", "minimumSkill"],
    }),
    validate: validate_program,
    defaults: &[
        ("photo", DefaultValue::Text("no-photo.jpg")),
        ("housing", DefaultValue::Bool(false)),
        ("jobAssistance", DefaultValue::Bool(false)),
        ("jobGuarantee", DefaultValue::Bool(false)),
        ("acceptGi", DefaultValue::Bool(false)),
    ],
    slug_source: Some("name"),
    unique_fields: &["name"],
    geocode: Some(GeocodeRule {
        address_field: "address",
        location_field: "location",
    }),
};

fn validate_program(doc: &Document, mode: ValidationMode) -> Result<(), ValidationErrors> {
    DocumentValidator::new(doc, mode)
        .required_string("name", Some(50))
        .required_string("description", Some(500))
        .url("website")
        .string("phone", Some(20), false)
        .email("email", false)
        .required_string("address", None)
        .string_list_of("careers", &CAREERS, true)
        .number_range("averageRating", Some(1.0), Some(10.0), false)
        .number_range("averageCost", Some(0.0), None, false)
        .string("photo", None, false)
        .boolean("housing")
        .boolean("jobAssistance")
        .boolean("jobGuarantee")
        .boolean("acceptGi")
        .string("user", None, false)
        .finish()
}
