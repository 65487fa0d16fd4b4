//! Reading a pack's schema files and resolving `$ref`s between them.
//!
//! A schema may reference a sibling document (`context.schema.json`) or a
//! fragment of one (`common.schema.json#/definitions/id`). Such references
//! are inlined when the schema is loaded, so the compiled form never touches
//! the filesystem again. References local to the root document (`#/...`)
//! are left for the validator.
//!
//! A foreign target that refers back to itself cannot be inlined. It is
//! hoisted into the root's `definitions` under a namespaced key and every
//! reference to it becomes a local `#/definitions/...` reference.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::SchemaError;
use crate::validator::Schema;

/// Upper bound on nested `$ref` inlining.
const MAX_REF_DEPTH: usize = 32;

/// Schema documents of one pack, read at most once each.
pub struct SchemaSource {
    dir: PathBuf,
    raw: HashMap<String, Value>,
}

/// State of one `load`.
#[derive(Default)]
struct Walk {
    /// Targets currently being inlined, as `file#pointer`.
    stack: Vec<String>,
    /// Targets reached again while on the stack.
    recursive: HashSet<String>,
    /// Resolved recursive targets, by definition name.
    hoisted: BTreeMap<String, Value>,
}

impl SchemaSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            raw: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read, resolve, and compile `file`.
    pub fn load(&mut self, file: &str) -> Result<Schema, SchemaError> {
        let document = self.read(file)?;
        let mut walk = Walk::default();
        let mut resolved = self.resolve(document, file, false, &mut walk)?;

        if !walk.hoisted.is_empty() {
            let Some(root) = resolved.as_object_mut() else {
                return Err(SchemaError::Invalid {
                    file: file.to_string(),
                    reason: "recursive $ref target needs an object root".into(),
                });
            };
            let definitions = root
                .entry("definitions")
                .or_insert_with(|| Value::Object(Map::new()));
            let Some(definitions) = definitions.as_object_mut() else {
                return Err(SchemaError::Invalid {
                    file: file.to_string(),
                    reason: "'definitions' must be an object".into(),
                });
            };
            for (name, schema) in walk.hoisted {
                debug!(file, definition = %name, "Hoisted recursive $ref target");
                definitions.insert(name, schema);
            }
        }

        Schema::compile_named(file, resolved)
    }

    /// Read and parse `file` without resolving references.
    pub fn read(&mut self, file: &str) -> Result<Value, SchemaError> {
        if let Some(doc) = self.raw.get(file) {
            return Ok(doc.clone());
        }
        if !is_plain_file_name(file) {
            return Err(SchemaError::UnsupportedRef {
                file: file.to_string(),
                reference: file.to_string(),
            });
        }

        let path = self.dir.join(file);
        if !path.is_file() {
            return Err(SchemaError::MissingFile(file.to_string()));
        }
        let content = std::fs::read_to_string(&path).map_err(|e| SchemaError::Unreadable {
            file: file.to_string(),
            reason: e.to_string(),
        })?;
        let document: Value = serde_json::from_str(&content).map_err(|e| SchemaError::Parse {
            file: file.to_string(),
            reason: e.to_string(),
        })?;

        debug!(file = %path.display(), "Read schema document");
        self.raw.insert(file.to_string(), document.clone());
        Ok(document)
    }

    /// Inline every cross-document `$ref` inside `node`.
    ///
    /// `foreign` is set while inlining content from another document; its
    /// local `#/...` references then point into that document and must be
    /// inlined too.
    fn resolve(
        &mut self,
        node: Value,
        origin: &str,
        foreign: bool,
        walk: &mut Walk,
    ) -> Result<Value, SchemaError> {
        match node {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    let reference = reference.clone();
                    if reference.starts_with('#') && !foreign {
                        return self.resolve_members(map, origin, foreign, walk);
                    }
                    return self.inline(&reference, origin, walk);
                }
                self.resolve_members(map, origin, foreign, walk)
            }
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.resolve(item, origin, foreign, walk))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other),
        }
    }

    fn resolve_members(
        &mut self,
        map: Map<String, Value>,
        origin: &str,
        foreign: bool,
        walk: &mut Walk,
    ) -> Result<Value, SchemaError> {
        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            let resolved = self.resolve(value, origin, foreign, walk)?;
            out.insert(key, resolved);
        }
        Ok(Value::Object(out))
    }

    fn inline(
        &mut self,
        reference: &str,
        origin: &str,
        walk: &mut Walk,
    ) -> Result<Value, SchemaError> {
        let (file_part, pointer) = match reference.split_once('#') {
            Some((file, pointer)) => (file, pointer),
            None => (reference, ""),
        };
        let target_file = if file_part.is_empty() { origin } else { file_part };

        if !is_plain_file_name(target_file) {
            return Err(SchemaError::UnsupportedRef {
                file: origin.to_string(),
                reference: reference.to_string(),
            });
        }

        let key = format!("{target_file}#{pointer}");
        if walk.stack.contains(&key) {
            walk.recursive.insert(key.clone());
            return Ok(local_ref(&definition_name(&key)));
        }
        if walk.stack.len() >= MAX_REF_DEPTH {
            return Err(SchemaError::RecursiveRef {
                file: origin.to_string(),
                reference: reference.to_string(),
            });
        }

        let document = match self.read(target_file) {
            Ok(doc) => doc,
            Err(SchemaError::MissingFile(_)) => {
                return Err(SchemaError::UnresolvedRef {
                    file: origin.to_string(),
                    reference: reference.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        let target = if pointer.is_empty() {
            document
        } else {
            document
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| SchemaError::UnresolvedRef {
                    file: origin.to_string(),
                    reference: reference.to_string(),
                })?
        };

        walk.stack.push(key.clone());
        let resolved = self.resolve(target, target_file, true, walk);
        walk.stack.pop();
        let resolved = resolved?;

        if !walk.recursive.contains(&key) {
            return Ok(resolved);
        }
        let name = definition_name(&key);
        let reference_only = local_ref(&name);
        // A target that is nothing but a reference to itself never terminates.
        if resolved == reference_only {
            return Err(SchemaError::RecursiveRef {
                file: origin.to_string(),
                reference: reference.to_string(),
            });
        }
        walk.hoisted.insert(name, resolved);
        Ok(reference_only)
    }
}

fn local_ref(name: &str) -> Value {
    serde_json::json!({ "$ref": format!("#/definitions/{name}") })
}

/// `common.schema.json#/definitions/node` -> `common.schema.json.definitions.node`.
fn definition_name(key: &str) -> String {
    key.replace("#/", ".")
        .replace('#', "")
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            '/' => '.',
            _ => '_',
        })
        .collect()
}

/// A bare file name: no directories, no `..`, no URL scheme.
fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(':') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, value: Value) {
        std::fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    #[test]
    fn loads_plain_schema() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.schema.json", json!({"type": "object"}));
        let mut source = SchemaSource::new(tmp.path());
        let schema = source.load("a.schema.json").unwrap();
        assert_eq!(schema.name(), "a.schema.json");
        assert!(schema.validate(&json!({})).ok);
    }

    #[test]
    fn missing_file_is_reported_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = SchemaSource::new(tmp.path());
        let err = source.load("output.schema.json").unwrap_err();
        assert_eq!(err.to_string(), "missing schema file: output.schema.json");
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("bad.schema.json"), "{ not json").unwrap();
        let mut source = SchemaSource::new(tmp.path());
        assert!(matches!(
            source.load("bad.schema.json").unwrap_err(),
            SchemaError::Parse { .. }
        ));
    }

    #[test]
    fn inlines_sibling_documents_and_fragments() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "common.schema.json",
            json!({
                "definitions": {
                    "id": {"type": "string", "minLength": 1},
                    "ids": {"type": "array", "items": {"$ref": "#/definitions/id"}}
                }
            }),
        );
        write(
            tmp.path(),
            "context.schema.json",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
        );
        write(
            tmp.path(),
            "validate.schema.json",
            json!({
                "type": "object",
                "properties": {
                    "context": {"$ref": "context.schema.json"},
                    "tags": {"$ref": "common.schema.json#/definitions/ids"}
                },
                "required": ["context"]
            }),
        );

        let mut source = SchemaSource::new(tmp.path());
        let schema = source.load("validate.schema.json").unwrap();
        assert!(schema.validate(&json!({"context": {"name": "x"}, "tags": ["a"]})).ok);

        let result = schema.validate(&json!({"context": {}, "tags": [""]}));
        let paths: Vec<String> = result.violations.iter().map(|v| v.path.to_string()).collect();
        assert_eq!(paths, vec!["context.name", "tags[0]"]);
    }

    #[test]
    fn dangling_reference_is_unresolved() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "a.schema.json",
            json!({"properties": {"x": {"$ref": "nope.schema.json"}}}),
        );
        write(
            tmp.path(),
            "b.schema.json",
            json!({"properties": {"x": {"$ref": "a.schema.json#/definitions/missing"}}}),
        );
        let mut source = SchemaSource::new(tmp.path());
        assert!(matches!(
            source.load("a.schema.json").unwrap_err(),
            SchemaError::UnresolvedRef { .. }
        ));
        assert!(matches!(
            source.load("b.schema.json").unwrap_err(),
            SchemaError::UnresolvedRef { .. }
        ));
    }

    #[test]
    fn reference_only_cycles_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.schema.json", json!({"$ref": "b.schema.json"}));
        write(tmp.path(), "b.schema.json", json!({"$ref": "a.schema.json"}));
        let mut source = SchemaSource::new(tmp.path());
        assert!(matches!(
            source.load("a.schema.json").unwrap_err(),
            SchemaError::RecursiveRef { .. }
        ));
    }

    #[test]
    fn mutually_recursive_documents_are_hoisted() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "a.schema.json",
            json!({"type": "array", "items": {"$ref": "b.schema.json"}}),
        );
        write(
            tmp.path(),
            "b.schema.json",
            json!({"type": "array", "items": {"$ref": "a.schema.json"}}),
        );
        let mut source = SchemaSource::new(tmp.path());
        let schema = source.load("a.schema.json").unwrap();
        assert!(schema.document()["definitions"]["b.schema.json"].is_object());
        assert!(schema.validate(&json!([[[[]]]])).ok);
        assert!(!schema.validate(&json!([[[3]]])).ok);
    }

    #[test]
    fn self_referencing_foreign_definition_is_hoisted() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "common.schema.json",
            json!({
                "definitions": {
                    "node": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "children": {"type": "array", "items": {"$ref": "#/definitions/node"}}
                        },
                        "required": ["name"]
                    }
                }
            }),
        );
        write(
            tmp.path(),
            "context.schema.json",
            json!({
                "type": "object",
                "properties": {"tree": {"$ref": "common.schema.json#/definitions/node"}},
                "required": ["tree"]
            }),
        );

        let mut source = SchemaSource::new(tmp.path());
        let schema = source.load("context.schema.json").unwrap();
        assert_eq!(
            schema.document()["properties"]["tree"],
            json!({"$ref": "#/definitions/common.schema.json.definitions.node"})
        );

        let ok = json!({"tree": {"name": "root", "children": [{"name": "leaf", "children": []}]}});
        assert!(schema.validate(&ok).ok);

        let bad = json!({"tree": {"name": "root", "children": [{"children": []}]}});
        let result = schema.validate(&bad);
        let paths: Vec<String> = result.violations.iter().map(|v| v.path.to_string()).collect();
        assert_eq!(paths, vec!["tree.children[0].name"]);
    }

    #[test]
    fn remote_and_escaping_references_are_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "remote.schema.json",
            json!({"$ref": "https://example.com/schema.json"}),
        );
        write(tmp.path(), "escape.schema.json", json!({"$ref": "../secret.json"}));
        let mut source = SchemaSource::new(tmp.path());
        for file in ["remote.schema.json", "escape.schema.json"] {
            assert!(matches!(
                source.load(file).unwrap_err(),
                SchemaError::UnsupportedRef { .. }
            ));
        }
    }

    #[test]
    fn local_refs_in_root_document_are_kept() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "tree.schema.json",
            json!({
                "definitions": {
                    "node": {
                        "type": "object",
                        "properties": {"children": {"type": "array", "items": {"$ref": "#/definitions/node"}}}
                    }
                },
                "$ref": "#/definitions/node"
            }),
        );
        let mut source = SchemaSource::new(tmp.path());
        let schema = source.load("tree.schema.json").unwrap();
        assert!(schema.validate(&json!({"children": [{"children": []}]})).ok);
        assert!(!schema.validate(&json!({"children": [{"children": 3}]})).ok);
    }
}
