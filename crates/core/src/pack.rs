//! Pack descriptors: one loaded pack, with its schemas compiled.

use packwarden_schema::{FieldPath, Schema};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::manifest::PackManifest;
use crate::method::Method;

/// Everything the registry needs to serve one method of a pack.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub input: Schema,
    pub output: Option<Schema>,
    /// Member of the call context under which required fields resolve.
    pub context_root: Option<FieldPath>,
}

/// An immutable, fully loaded pack.
#[derive(Debug, Clone)]
pub struct PackDescriptor {
    pub manifest: PackManifest,
    /// Directory the pack was loaded from.
    pub dir: PathBuf,
    pub methods: BTreeMap<Method, MethodSpec>,
    /// Fields gated methods require, in manifest (or derivation) order.
    pub required_fields: Vec<FieldPath>,
    pub recommended_fields: Vec<FieldPath>,
    pub events_schema: Option<Schema>,
    /// `prompts/<method>.md` bodies. Opaque to the registry.
    pub prompts: BTreeMap<Method, String>,
}

impl PackDescriptor {
    pub fn pack_id(&self) -> &str {
        &self.manifest.pack_id
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn method(&self, method: Method) -> Option<&MethodSpec> {
        self.methods.get(&method)
    }

    pub fn prompt(&self, method: Method) -> Option<&str> {
        self.prompts.get(&method).map(String::as_str)
    }

    /// Directory name on disk, used in load reports.
    pub fn dir_name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.dir.display().to_string())
    }

    pub fn summary(&self) -> PackSummary {
        PackSummary {
            pack_id: self.manifest.pack_id.clone(),
            name: self.manifest.name.clone(),
            version: self.manifest.version.clone(),
            dir: self.dir_name(),
            methods: self.methods.keys().copied().collect(),
            required_fields: self.required_fields.clone(),
        }
    }
}

/// The discovery view of a loaded pack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackSummary {
    pub pack_id: String,
    pub name: String,
    pub version: String,
    pub dir: String,
    pub methods: Vec<Method>,
    pub required_fields: Vec<FieldPath>,
}

/// Member of the `validate` input that holds the original call context.
pub const VALIDATE_CONTEXT_ROOT: &str = "context";

/// Input schema used when a pack declares none for `method`.
///
/// `describe` and `requirements` accept any object, including `{}`.
/// `validate` takes `{context, outputs}` with both members objects.
/// `plan` and `execute` have no fallback.
pub fn builtin_input_schema(method: Method) -> Option<Value> {
    match method {
        Method::Describe | Method::Requirements => Some(json!({"type": "object"})),
        Method::Validate => Some(json!({
            "type": "object",
            "properties": {
                VALIDATE_CONTEXT_ROOT: {"type": "object"},
                "outputs": {"type": "object"}
            },
            "required": [VALIDATE_CONTEXT_ROOT, "outputs"]
        })),
        Method::Plan | Method::Execute => None,
    }
}

/// Derive required field paths from a schema's nested `required` lists.
///
/// Walks depth-first in declaration order. Each required property is
/// listed, followed by the required members of its own object schema.
pub fn derive_required_fields(schema: &Value) -> Vec<FieldPath> {
    let mut out = Vec::new();
    collect_required(schema, &FieldPath::root(), &mut out);
    out
}

fn collect_required(schema: &Value, prefix: &FieldPath, out: &mut Vec<FieldPath>) {
    let Some(object) = schema.as_object() else {
        return;
    };
    let declared_object = match object.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(_) => false,
        None => object.contains_key("properties"),
    };
    if !declared_object {
        return;
    }

    let Some(required) = object.get("required").and_then(Value::as_array) else {
        return;
    };
    let properties = object.get("properties").and_then(Value::as_object);
    for name in required.iter().filter_map(Value::as_str) {
        let path = prefix.child(name);
        if !out.contains(&path) {
            out.push(path.clone());
        }
        if let Some(sub) = properties.and_then(|p| p.get(name)) {
            collect_required(sub, &path, out);
        }
    }
}
