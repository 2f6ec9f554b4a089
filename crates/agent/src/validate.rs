//! Strict validation of raw model text against a closed schema.
//!
//! The model is an untrusted producer, so validation is deliberately exact:
//! the root object's key set must match the schema's key set (compared
//! case-insensitively, no missing keys, no extras) and every field must have
//! the declared kind. Schema drift surfaces as a retry trigger instead of
//! silently propagating bad data.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// A closed set of named, typed fields a structured response must match.
#[derive(Clone, Debug)]
pub struct Schema {
    fields: Vec<Field>,
}

#[derive(Clone, Debug)]
pub struct Field {
    name: &'static str,
    kind: Kind,
    non_empty: bool,
    optional: bool,
}

#[derive(Clone, Debug)]
pub enum Kind {
    String,
    Number,
    StringArray,
    StringMap,
    ObjectArray(Schema),
}

impl Schema {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Self { fields: fields.into_iter().collect() }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }
}

impl Field {
    fn new(name: &'static str, kind: Kind) -> Self {
        Self { name, kind, non_empty: false, optional: false }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, Kind::String)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, Kind::Number)
    }

    pub fn string_array(name: &'static str) -> Self {
        Self::new(name, Kind::StringArray)
    }

    pub fn string_map(name: &'static str) -> Self {
        Self::new(name, Kind::StringMap)
    }

    pub fn object_array(name: &'static str, element: Schema) -> Self {
        Self::new(name, Kind::ObjectArray(element))
    }

    /// Reject an empty array for this field.
    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    /// Allow this field to be absent. Extra keys are still rejected.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("response is not valid JSON")]
    NotJson,
    #[error("root is not an object")]
    RootNotObject,
    #[error("unexpected or missing keys (expected {expected:?}, found {found:?})")]
    KeySetMismatch { expected: Vec<String>, found: Vec<String> },
    #[error("field `{field}` is not a {expected}")]
    WrongKind { field: String, expected: &'static str },
    #[error("field `{field}` must not be empty")]
    EmptyArray { field: String },
    #[error("validated value could not be materialized: {0}")]
    Materialize(String),
}

/// Outcome of one validation pass. Never exposed past the retry controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The normalized root object, keyed by the schema's field spellings.
    Valid(Map<String, Value>),
    Invalid(ValidationError),
}

/// Validates `raw_text` against `schema`.
///
/// The JSON candidate is the substring from the first `{` to the last `}`
/// when both exist in order, otherwise the full text.
pub fn validate(raw_text: &str, schema: &Schema) -> ValidationOutcome {
    let candidate = json_candidate(raw_text);

    let parsed: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(_) => return ValidationOutcome::Invalid(ValidationError::NotJson),
    };

    let Value::Object(object) = parsed else {
        return ValidationOutcome::Invalid(ValidationError::RootNotObject);
    };

    match check_object(&object, schema) {
        Ok(normalized) => ValidationOutcome::Valid(normalized),
        Err(error) => ValidationOutcome::Invalid(error),
    }
}

/// Validates and materializes the normalized object into a typed value.
pub fn validate_as<T: DeserializeOwned>(
    raw_text: &str,
    schema: &Schema,
) -> Result<T, ValidationError> {
    match validate(raw_text, schema) {
        ValidationOutcome::Valid(object) => serde_json::from_value(Value::Object(object))
            .map_err(|error| ValidationError::Materialize(error.to_string())),
        ValidationOutcome::Invalid(error) => Err(error),
    }
}

fn json_candidate(raw_text: &str) -> &str {
    match (raw_text.find('{'), raw_text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw_text[start..=end],
        _ => raw_text,
    }
}

fn check_object(
    object: &Map<String, Value>,
    schema: &Schema,
) -> Result<Map<String, Value>, ValidationError> {
    let key_set_mismatch = || ValidationError::KeySetMismatch {
        expected: schema.fields.iter().map(|field| field.name.to_string()).collect(),
        found: object.keys().cloned().collect(),
    };

    // Every response key must map to a schema field; no extras allowed.
    for key in object.keys() {
        if !schema.fields.iter().any(|field| field.name.eq_ignore_ascii_case(key)) {
            return Err(key_set_mismatch());
        }
    }

    let mut normalized = Map::new();
    for field in &schema.fields {
        let value = object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(field.name))
            .map(|(_, value)| value);

        let Some(value) = value else {
            if field.optional {
                continue;
            }
            return Err(key_set_mismatch());
        };

        normalized.insert(field.name.to_string(), check_field(field, value)?);
    }

    Ok(normalized)
}

fn check_field(field: &Field, value: &Value) -> Result<Value, ValidationError> {
    let wrong_kind = |expected: &'static str| ValidationError::WrongKind {
        field: field.name.to_string(),
        expected,
    };

    match &field.kind {
        Kind::String => {
            value.as_str().ok_or_else(|| wrong_kind("string"))?;
            Ok(value.clone())
        }
        Kind::Number => {
            if !value.is_number() {
                return Err(wrong_kind("number"));
            }
            Ok(value.clone())
        }
        Kind::StringArray => {
            let elements = value.as_array().ok_or_else(|| wrong_kind("array"))?;
            if elements.iter().any(|element| !element.is_string()) {
                return Err(wrong_kind("array of strings"));
            }
            if field.non_empty && elements.is_empty() {
                return Err(ValidationError::EmptyArray { field: field.name.to_string() });
            }
            Ok(value.clone())
        }
        Kind::StringMap => {
            let entries = value.as_object().ok_or_else(|| wrong_kind("object"))?;
            if entries.values().any(|entry| !entry.is_string()) {
                return Err(wrong_kind("object of strings"));
            }
            Ok(value.clone())
        }
        Kind::ObjectArray(element_schema) => {
            let elements = value.as_array().ok_or_else(|| wrong_kind("array"))?;
            if field.non_empty && elements.is_empty() {
                return Err(ValidationError::EmptyArray { field: field.name.to_string() });
            }
            let mut normalized_elements = Vec::with_capacity(elements.len());
            for element in elements {
                let Value::Object(object) = element else {
                    return Err(wrong_kind("array of objects"));
                };
                normalized_elements.push(Value::Object(check_object(object, element_schema)?));
            }
            Ok(Value::Array(normalized_elements))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{validate, validate_as, Field, Schema, ValidationError, ValidationOutcome};

    fn budget_schema() -> Schema {
        Schema::new([
            Field::string_array("items").non_empty(),
            Field::number("totalCost"),
            Field::string("note"),
        ])
    }

    #[test]
    fn conforming_json_is_valid() {
        let raw = r#"{"items":["egg","rice"],"totalCost":1.2,"note":"Removed cheese"}"#;
        let outcome = validate(raw, &budget_schema());
        let ValidationOutcome::Valid(object) = outcome else {
            panic!("expected Valid, got {outcome:?}");
        };
        assert_eq!(object["items"][1], "rice");
        assert_eq!(object["note"], "Removed cheese");
    }

    #[test]
    fn json_is_extracted_from_surrounding_prose() {
        let raw = "Here is a suggestion:\n{\"items\":[\"egg\",\"rice\"],\"totalCost\":1.2,\"note\":\"Removed cheese\"}\nHope that helps!";
        let outcome = validate(raw, &budget_schema());
        assert!(matches!(outcome, ValidationOutcome::Valid(_)));
    }

    #[test]
    fn items_and_note_are_extracted_from_a_prose_wrapped_object() {
        let schema = Schema::new([Field::string_array("items"), Field::string("note")]);
        let raw = "Here is a suggestion:\n{ \"items\": [\"egg\", \"rice\"], \"note\": \"Removed cheese\" }";

        let ValidationOutcome::Valid(object) = validate(raw, &schema) else {
            panic!("prose-wrapped object should validate");
        };
        assert_eq!(object["items"][0], "egg");
        assert_eq!(object["items"][1], "rice");
        assert_eq!(object["note"], "Removed cheese");
    }

    #[test]
    fn text_without_braces_is_not_json() {
        let outcome = validate("no json here", &budget_schema());
        assert_eq!(outcome, ValidationOutcome::Invalid(ValidationError::NotJson));
    }

    #[test]
    fn root_must_be_an_object() {
        // No braces anywhere, so the full text is the candidate.
        let outcome = validate("[1, 2, 3]", &budget_schema());
        assert_eq!(outcome, ValidationOutcome::Invalid(ValidationError::RootNotObject));
    }

    #[test]
    fn one_extra_key_is_rejected() {
        let raw = r#"{"items":["egg"],"totalCost":1.0,"note":"x","comment":"bonus"}"#;
        let outcome = validate(raw, &budget_schema());
        assert!(matches!(
            outcome,
            ValidationOutcome::Invalid(ValidationError::KeySetMismatch { .. })
        ));
    }

    #[test]
    fn one_missing_key_is_rejected() {
        let raw = r#"{"items":["egg"],"totalCost":1.0}"#;
        let outcome = validate(raw, &budget_schema());
        assert!(matches!(
            outcome,
            ValidationOutcome::Invalid(ValidationError::KeySetMismatch { .. })
        ));
    }

    #[test]
    fn key_comparison_is_case_insensitive_and_normalizes_spelling() {
        let raw = r#"{"Items":["egg"],"TOTALCOST":1.0,"Note":"x"}"#;
        let ValidationOutcome::Valid(object) = validate(raw, &budget_schema()) else {
            panic!("case-insensitive keys should validate");
        };
        assert!(object.contains_key("items"));
        assert!(object.contains_key("totalCost"));
        assert!(object.contains_key("note"));
    }

    #[test]
    fn wrong_field_kind_is_rejected_with_field_name() {
        let raw = r#"{"items":"egg","totalCost":1.0,"note":"x"}"#;
        let outcome = validate(raw, &budget_schema());
        assert_eq!(
            outcome,
            ValidationOutcome::Invalid(ValidationError::WrongKind {
                field: "items".to_string(),
                expected: "array",
            })
        );
    }

    #[test]
    fn non_string_array_element_is_rejected() {
        let raw = r#"{"items":["egg", 3],"totalCost":1.0,"note":"x"}"#;
        let outcome = validate(raw, &budget_schema());
        assert!(matches!(outcome, ValidationOutcome::Invalid(ValidationError::WrongKind { .. })));
    }

    #[test]
    fn empty_required_array_is_rejected() {
        let raw = r#"{"items":[],"totalCost":0,"note":"nothing"}"#;
        let outcome = validate(raw, &budget_schema());
        assert_eq!(
            outcome,
            ValidationOutcome::Invalid(ValidationError::EmptyArray {
                field: "items".to_string()
            })
        );
    }

    #[test]
    fn nested_object_arrays_validate_recursively() {
        let schema = Schema::new([Field::object_array(
            "meals",
            Schema::new([
                Field::string("name"),
                Field::string_array("ingredients").non_empty(),
                Field::string("notes").optional(),
            ]),
        )
        .non_empty()]);

        let raw = r#"{"meals":[{"name":"Khichdi","ingredients":["rice","lentils"]},{"name":"Salad","ingredients":["lettuce"],"notes":"side"}]}"#;
        let ValidationOutcome::Valid(object) = validate(raw, &schema) else {
            panic!("nested meals should validate");
        };
        assert_eq!(object["meals"][0]["name"], "Khichdi");

        let bad = r#"{"meals":[{"name":"Khichdi","ingredients":"rice"}]}"#;
        assert!(matches!(
            validate(bad, &schema),
            ValidationOutcome::Invalid(ValidationError::WrongKind { .. })
        ));
    }

    #[test]
    fn string_map_values_must_be_strings() {
        let schema = Schema::new([Field::string_map("categorizedItems")]);
        let good = r#"{"categorizedItems":{"egg":"A dozen fresh eggs."}}"#;
        assert!(matches!(validate(good, &schema), ValidationOutcome::Valid(_)));

        let bad = r#"{"categorizedItems":{"egg":12}}"#;
        assert!(matches!(
            validate(bad, &schema),
            ValidationOutcome::Invalid(ValidationError::WrongKind { .. })
        ));
    }

    #[test]
    fn validate_as_materializes_typed_values() {
        #[derive(serde::Deserialize)]
        struct BudgetWire {
            items: Vec<String>,
            #[serde(rename = "totalCost")]
            total_cost: f64,
            note: String,
        }

        let raw = r#"{"items":["egg","rice"],"totalCost":1.2,"note":"Removed cheese"}"#;
        let wire: BudgetWire = validate_as(raw, &budget_schema()).expect("materialize");
        assert_eq!(wire.items.len(), 2);
        assert!((wire.total_cost - 1.2).abs() < f64::EPSILON);
        assert_eq!(wire.note, "Removed cheese");
    }
}
