use super::{DefaultValue, PopulationDef, Relation, RelationKind, ResourceDef};
use crate::filtering::FieldKind;
use crate::store::Document;
use crate::validation::{DocumentValidator, ValidationErrors, ValidationMode};

pub const SKILL_LEVELS: [&str; 3] = ["beginner", "intermediate", "advanced"];

pub static COURSES: ResourceDef = ResourceDef {
    collection: "courses",
    singular: "Course",
    fields: &[
        ("title", FieldKind::Text),
        ("description", FieldKind::Text),
        ("weeks", FieldKind::Number),
        ("tuition", FieldKind::Number),
        ("minimumSkill", FieldKind::Text),
        ("scholarshipAvailable", FieldKind::Boolean),
        ("program", FieldKind::Text),
        ("createdAt", FieldKind::Date),
    ],
    relations: &[Relation {
        name: "program",
        kind: RelationKind::BelongsTo {
            collection: "programs",
            foreign_key: "program",
        },
    }],
    list_population: Some(PopulationDef {
        relation: "program",
        select: &["name", "description", "averageCost"],
    }),
    item_population: Some(PopulationDef {
        relation: "program",
        select: &["name", "description"],
    }),
    validate: validate_course,
    defaults: &[("scholarshipAvailable", DefaultValue::Bool(false))],
    slug_source: None,
    unique_fields: &[],
    geocode: None,
};

fn validate_course(doc: &Document, mode: ValidationMode) -> Result<(), ValidationErrors> {
    DocumentValidator::new(doc, mode)
        .required_string("title", Some(100))
        .required_string("description", None)
        .number_range("weeks", Some(1.0), None, true)
        .number_range("tuition", Some(0.0), None, true)
        .one_of("minimumSkill", &SKILL_LEVELS, true)
        .boolean("scholarshipAvailable")
        .required_string("program", None)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_course_validation() {
        let Value::Object(body) = json!({
            "title": "Front End Web Development",
            "description": "HTML, CSS and JavaScript",
            "weeks": 8,
            "tuition": 8000,
            "minimumSkill": "beginner",
            "program": "p1"
        }) else {
            unreachable!()
        };
        assert!(validate_course(&body, ValidationMode::Create).is_ok());

        let mut bad = body.clone();
        bad.insert("minimumSkill".into(), json!("expert"));
        bad.remove("program");
        let err = validate_course(&bad, ValidationMode::Create).unwrap_err();
        assert_eq!(err.len(), 2);
    }
}
