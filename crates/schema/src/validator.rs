//! Compiled schemas and violation reporting.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::SchemaError;
use crate::path::FieldPath;

/// One way in which a value fails a schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Violation {
    /// Where in the value the problem is (`$` for the root).
    pub path: FieldPath,
    /// The schema keyword that failed (`type`, `required`, `enum`, ...).
    pub keyword: String,
    /// Human-readable description.
    pub message: String,
}

/// The outcome of validating one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    fn from_violations(mut violations: Vec<Violation>) -> Self {
        violations.sort();
        violations.dedup();
        Self {
            ok: violations.is_empty(),
            violations,
        }
    }
}

/// A schema document, resolved and compiled once.
///
/// Cheap to clone; the compiled form is shared.
#[derive(Clone)]
pub struct Schema {
    name: String,
    document: Arc<Value>,
    compiled: Arc<JSONSchema>,
}

impl Schema {
    /// Compile an inline document (built-in schemas).
    pub fn compile(document: Value) -> Result<Self, SchemaError> {
        Self::compile_named("<inline>", document)
    }

    /// Compile a document read from `name`. `$ref`s to other files must
    /// already be resolved (see [`crate::SchemaSource`]).
    pub fn compile_named(name: &str, document: Value) -> Result<Self, SchemaError> {
        if !document.is_object() && !document.is_boolean() {
            return Err(SchemaError::Invalid {
                file: name.to_string(),
                reason: "schema must be a JSON object or boolean".into(),
            });
        }
        let compiled = match JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&document)
        {
            Ok(compiled) => compiled,
            Err(e) => {
                return Err(SchemaError::Invalid {
                    file: name.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        Ok(Self {
            name: name.to_string(),
            document: Arc::new(document),
            compiled: Arc::new(compiled),
        })
    }

    /// The file this schema was loaded from, or `<inline>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved document, as exposed through discovery.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Validate `value`, collecting every violation.
    pub fn validate(&self, value: &Value) -> ValidationResult {
        let mut violations = Vec::new();
        if let Err(errors) = self.compiled.validate(value) {
            for error in errors {
                let at = FieldPath::from_pointer(&error.instance_path.to_string());
                let keyword = keyword_of(&error.schema_path.to_string());
                match &error.kind {
                    ValidationErrorKind::Required { property } => {
                        let name = property
                            .as_str()
                            .map(str::to_owned)
                            .unwrap_or_else(|| property.to_string());
                        violations.push(Violation {
                            message: format!("required property '{name}' is missing"),
                            path: at.child(name),
                            keyword,
                        });
                    }
                    ValidationErrorKind::AdditionalProperties { unexpected } => {
                        for property in unexpected {
                            violations.push(Violation {
                                path: at.child(property.clone()),
                                keyword: keyword.clone(),
                                message: format!("additional property '{property}' is not allowed"),
                            });
                        }
                    }
                    _ => violations.push(Violation {
                        path: at,
                        keyword,
                        message: error.to_string(),
                    }),
                }
            }
        }
        ValidationResult::from_violations(violations)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("document", &self.document)
            .finish()
    }
}

/// Validate `value` against `schema`.
pub fn validate(schema: &Schema, value: &Value) -> ValidationResult {
    schema.validate(value)
}

fn keyword_of(schema_path: &str) -> String {
    schema_path
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("schema")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn closed_schema() -> Schema {
        Schema::compile(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "stage": {"type": "string", "enum": ["trial", "paid"]},
                "steps": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"title": {"type": "string"}},
                        "required": ["title"]
                    }
                }
            },
            "required": ["name"],
            "additionalProperties": false
        }))
        .unwrap()
    }

    fn paths(result: &ValidationResult) -> Vec<String> {
        result.violations.iter().map(|v| v.path.to_string()).collect()
    }

    #[test]
    fn conforming_value_passes() {
        let result = closed_schema().validate(&json!({"name": "x", "stage": "trial", "steps": []}));
        assert!(result.ok);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn type_violation_points_at_field() {
        let result = closed_schema().validate(&json!({"name": 42}));
        assert!(!result.ok);
        assert_eq!(paths(&result), vec!["name"]);
        assert_eq!(result.violations[0].keyword, "type");
    }

    #[test]
    fn missing_required_names_the_property() {
        let result = closed_schema().validate(&json!({}));
        assert_eq!(paths(&result), vec!["name"]);
        assert_eq!(result.violations[0].keyword, "required");
        assert!(result.violations[0].message.contains("name"));
    }

    #[test]
    fn closed_schema_rejects_extra_properties() {
        let result = closed_schema().validate(&json!({"name": "x", "extra": 1, "other": 2}));
        assert_eq!(paths(&result), vec!["extra", "other"]);
        assert!(result.violations.iter().all(|v| v.keyword == "additionalProperties"));
    }

    #[test]
    fn open_schema_allows_extra_properties() {
        let open = Schema::compile(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        }))
        .unwrap();
        assert!(open.validate(&json!({"name": "x", "extra": {"deep": true}})).ok);
    }

    #[test]
    fn violations_are_collected_not_short_circuited() {
        let result = closed_schema().validate(&json!({
            "name": 1,
            "stage": "churned",
            "steps": [{"title": "ok"}, {}],
            "extra": true
        }));
        assert_eq!(
            paths(&result),
            vec!["extra", "name", "stage", "steps[1].title"]
        );
    }

    #[test]
    fn validation_is_deterministic() {
        let value = json!({"name": 1, "stage": "x", "extra": true});
        let first = closed_schema().validate(&value);
        let second = closed_schema().validate(&value);
        assert_eq!(first, second);
    }

    #[test]
    fn local_refs_are_supported() {
        let schema = Schema::compile(json!({
            "definitions": {"id": {"type": "string", "minLength": 1}},
            "type": "object",
            "properties": {"id": {"$ref": "#/definitions/id"}}
        }))
        .unwrap();
        assert!(schema.validate(&json!({"id": "a"})).ok);
        let result = schema.validate(&json!({"id": ""}));
        assert_eq!(paths(&result), vec!["id"]);
    }

    #[test]
    fn malformed_schema_is_a_compile_error() {
        let err = Schema::compile(json!({"type": "not-a-type"})).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid { .. }));

        let err = Schema::compile_named("x.schema.json", json!(["not", "a", "schema"])).unwrap_err();
        assert!(err.to_string().contains("x.schema.json"));
    }

    #[test]
    fn non_object_values_never_panic() {
        let schema = closed_schema();
        for value in [json!(null), json!([1, 2]), json!("text"), json!(3.5)] {
            let result = schema.validate(&value);
            assert!(!result.ok);
            assert_eq!(paths(&result), vec!["$"]);
        }
    }
}
