use super::{DefaultValue, ResourceDef};
use crate::filtering::FieldKind;
use crate::store::Document;
use crate::validation::{DocumentValidator, ValidationErrors, ValidationMode};

pub const ROLES: [&str; 2] = ["user", "publisher"];

pub static USERS: ResourceDef = ResourceDef {
    collection: "users",
    singular: "User",
    fields: &[
        ("name", FieldKind::Text),
        ("email", FieldKind::Text),
        ("role", FieldKind::Text),
        ("createdAt", FieldKind::Date),
    ],
    relations: &[],
    list_population: None,
    item_population: None,
    validate: validate_user,
    defaults: &[("role", DefaultValue::Text("user"))],
    slug_source: None,
    unique_fields: &["email"],
    geocode: None,
};

fn validate_user(doc: &Document, mode: ValidationMode) -> Result<(), ValidationErrors> {
    DocumentValidator::new(doc, mode)
        .required_string("name", None)
        .email("email", true)
        .one_of("role", &ROLES, false)
        .finish()
}
