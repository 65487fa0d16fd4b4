//! `pack.json` — the manifest every pack directory carries.
//!
//! Parsing runs in two phases. The structural fields (`pack_id`, `methods`,
//! `schema_refs`) are read from the raw JSON value by hand so that each
//! problem maps onto a precise [`ManifestError`]; the descriptive fields are
//! then deserialized with serde defaults.

use packwarden_schema::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::ManifestError;
use crate::method::Method;
use crate::operation::is_valid_pack_id;
use crate::pack::builtin_input_schema;

pub const MANIFEST_FILE: &str = "pack.json";
pub const DEFAULT_VERSION: &str = "0.0.0";

/// A parsed and validated pack manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackManifest {
    pub pack_id: String,
    pub name: String,
    pub version: String,
    pub summary: String,
    pub domain_tags: Vec<String>,
    pub primary_outcomes: Vec<String>,
    pub selection: Selection,
    /// Declared methods, in manifest order.
    pub methods: Vec<Method>,
    pub schema_refs: BTreeMap<Method, SchemaRefs>,
    pub events_schema: Option<String>,
    /// `None` when the manifest leaves it to be derived from a schema.
    pub required_context_fields: Option<Vec<FieldPath>>,
    pub recommended_context_fields: Vec<FieldPath>,
    pub plan_steps: Vec<PlanStep>,
    pub quality_gates: Vec<QualityGate>,
}

/// Schema files bound to one method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaRefs {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    /// Member of the call context under which required fields resolve.
    #[serde(default)]
    pub context_root: Option<FieldPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One step emitted by the built-in `plan` hook. Text fields may contain
/// `{{path}}` placeholders filled from the call context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_id: String,
    pub title: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub success_check: String,
    #[serde(default)]
    pub inputs_needed: Vec<String>,
    #[serde(default)]
    pub outputs_produced: Vec<String>,
}

/// A check the built-in `validate` hook runs against `outputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    pub gate: String,
    /// Path into `outputs`.
    pub path: FieldPath,
    #[serde(flatten)]
    pub rule: GateRule,
    /// Suggested fix reported when the gate fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GateRule {
    /// Present and non-null.
    Present,
    /// Present, and not an empty string, array, or object.
    NonEmpty,
    /// An array with at least `min_items` elements.
    MinItems { min_items: usize },
}

/// Descriptive fields, deserialized after the structural ones are checked.
#[derive(Deserialize)]
struct Body {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    domain_tags: Vec<String>,
    #[serde(default)]
    primary_outcomes: Vec<String>,
    #[serde(default)]
    selection: Selection,
    #[serde(default)]
    events_schema: Option<String>,
    #[serde(default)]
    required_context_fields: Option<Vec<String>>,
    #[serde(default)]
    recommended_context_fields: Vec<String>,
    #[serde(default)]
    plan_steps: Vec<PlanStep>,
    #[serde(default)]
    quality_gates: Vec<QualityGate>,
}

impl PackManifest {
    /// Parse and validate the text of a `pack.json`.
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ManifestError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        let Value::Object(object) = &value else {
            return Err(ManifestError::NotAnObject);
        };

        let pack_id = parse_pack_id(object)?;
        let methods = parse_methods(object)?;
        let schema_refs = parse_schema_refs(object, &methods)?;

        let body: Body = serde_json::from_value(value).map_err(|e| ManifestError::InvalidField {
            field: "manifest".into(),
            reason: e.to_string(),
        })?;

        let required_context_fields = body
            .required_context_fields
            .map(|fields| parse_paths(&fields))
            .transpose()?;
        let recommended_context_fields = parse_paths(&body.recommended_context_fields)?;

        let manifest = Self {
            name: body.name.unwrap_or_else(|| pack_id.clone()),
            version: body.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            pack_id,
            summary: body.summary,
            domain_tags: body.domain_tags,
            primary_outcomes: body.primary_outcomes,
            selection: body.selection,
            methods,
            schema_refs,
            events_schema: body.events_schema,
            required_context_fields,
            recommended_context_fields,
            plan_steps: body.plan_steps,
            quality_gates: body.quality_gates,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Cross-field checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ManifestError> {
        for method in &self.methods {
            let has_input = self
                .schema_refs
                .get(method)
                .is_some_and(|refs| refs.input.is_some());
            let has_builtin = builtin_input_schema(*method).is_some();
            if !has_input && !has_builtin {
                return Err(ManifestError::MissingInputSchema(*method));
            }
        }
        for (i, step) in self.plan_steps.iter().enumerate() {
            if step.step_id.trim().is_empty() {
                return Err(ManifestError::InvalidField {
                    field: format!("plan_steps[{i}].step_id"),
                    reason: "must not be empty".into(),
                });
            }
        }
        for (i, gate) in self.quality_gates.iter().enumerate() {
            if gate.gate.trim().is_empty() {
                return Err(ManifestError::InvalidField {
                    field: format!("quality_gates[{i}].gate"),
                    reason: "must not be empty".into(),
                });
            }
        }
        Ok(())
    }

    pub fn declares(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    pub fn schema_refs_for(&self, method: Method) -> Option<&SchemaRefs> {
        self.schema_refs.get(&method)
    }

    /// `selection.triggers[].id`, in manifest order.
    pub fn trigger_hints(&self) -> Vec<String> {
        self.selection.triggers.iter().map(|t| t.id.clone()).collect()
    }
}

// ── Internal ──

fn parse_pack_id(object: &Map<String, Value>) -> Result<String, ManifestError> {
    match object.get("pack_id") {
        None | Some(Value::Null) => Err(ManifestError::MissingField("pack_id")),
        Some(Value::String(id)) if is_valid_pack_id(id) => Ok(id.clone()),
        Some(Value::String(id)) => Err(ManifestError::InvalidPackId { pack_id: id.clone() }),
        Some(other) => Err(ManifestError::InvalidField {
            field: "pack_id".into(),
            reason: format!("expected a string, got {}", type_name(other)),
        }),
    }
}

fn parse_methods(object: &Map<String, Value>) -> Result<Vec<Method>, ManifestError> {
    let items = match object.get("methods") {
        None | Some(Value::Null) => return Err(ManifestError::MissingField("methods")),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ManifestError::InvalidField {
                field: "methods".into(),
                reason: format!("expected an array, got {}", type_name(other)),
            });
        }
    };
    if items.is_empty() {
        return Err(ManifestError::NoMethods);
    }

    let mut methods = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(name) = item else {
            return Err(ManifestError::InvalidField {
                field: "methods".into(),
                reason: format!("expected method names, got {}", type_name(item)),
            });
        };
        let method: Method = name
            .parse()
            .map_err(|_| ManifestError::UnknownMethod(name.clone()))?;
        if methods.contains(&method) {
            return Err(ManifestError::DuplicateMethod(method));
        }
        methods.push(method);
    }
    Ok(methods)
}

fn parse_schema_refs(
    object: &Map<String, Value>,
    methods: &[Method],
) -> Result<BTreeMap<Method, SchemaRefs>, ManifestError> {
    let entries = match object.get("schema_refs") {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            return Err(ManifestError::InvalidField {
                field: "schema_refs".into(),
                reason: format!("expected an object, got {}", type_name(other)),
            });
        }
    };

    let mut refs = BTreeMap::new();
    for (name, entry) in entries {
        let method: Method = name
            .parse()
            .map_err(|_| ManifestError::UnknownMethod(name.clone()))?;
        if !methods.contains(&method) {
            return Err(ManifestError::UndeclaredSchemaRef(method));
        }
        let parsed: SchemaRefs =
            serde_json::from_value(entry.clone()).map_err(|e| ManifestError::InvalidField {
                field: format!("schema_refs.{name}"),
                reason: e.to_string(),
            })?;
        refs.insert(method, parsed);
    }
    Ok(refs)
}

fn parse_paths(raw: &[String]) -> Result<Vec<FieldPath>, ManifestError> {
    raw.iter()
        .map(|p| FieldPath::parse(p).map_err(ManifestError::from))
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
