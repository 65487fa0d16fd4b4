//! # Packwarden Registry
//!
//! Turns a directory of packs into dispatchable operations.
//!
//! - [`loader`] scans the packs root and builds a descriptor per valid pack,
//!   collecting a reason for every one it rejects.
//! - [`registry`] derives an operation per (pack, method), binds hooks and
//!   exposes discovery.
//! - [`dispatch`] runs a call through gating, validation and the hook.
//! - [`handle`] holds the live registry and swaps it on reload.

pub mod dispatch;
pub mod handle;
pub mod loader;
pub mod registry;

pub use dispatch::{DispatchEngine, dispatch_on};
pub use handle::RegistryHandle;
pub use loader::{LoadIssue, LoadResult, load, load_pack};
pub use registry::{OperationEntry, OperationInfo, Registry};

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::path::Path;

    /// A pack written to disk by tests.
    pub struct PackFixture {
        pub manifest: Value,
        pub schemas: BTreeMap<String, Value>,
        pub prompts: BTreeMap<String, String>,
    }

    pub fn context_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "product": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "trial_type": {"type": "string", "enum": ["free_trial", "freemium"]}
                    },
                    "required": ["name"]
                },
                "funnel": {
                    "type": "object",
                    "properties": {"stages": {"type": "array", "items": {"type": "string"}}},
                    "required": ["stages"]
                }
            },
            "required": ["product", "funnel"]
        })
    }

    impl PackFixture {
        /// All five methods, explicit required fields, an execute prompt.
        pub fn standard(pack_id: &str) -> Self {
            let manifest = json!({
                "pack_id": pack_id,
                "name": format!("{pack_id} pack"),
                "version": "1.0.0",
                "summary": "Fixture pack",
                "methods": ["describe", "requirements", "plan", "execute", "validate"],
                "schema_refs": {
                    "plan": {"input": "context.schema.json"},
                    "execute": {"input": "context.schema.json", "output": "output.schema.json"},
                    "validate": {"input": "validate.schema.json", "context_root": "context"}
                },
                "required_context_fields": ["product.name", "funnel.stages"],
                "plan_steps": [
                    {"step_id": "1", "title": "Confirm activation for {{product.name}}"}
                ],
                "quality_gates": [
                    {"gate": "brief_present", "path": "brief", "rule": "non_empty"}
                ]
            });

            let schemas = BTreeMap::from([
                ("context.schema.json".to_string(), context_schema()),
                (
                    "output.schema.json".to_string(),
                    json!({
                        "type": "object",
                        "properties": {
                            "needs_context": {"type": "boolean"},
                            "brief": {"type": "string"},
                            "telemetry_events": {"type": "array"}
                        },
                        "required": ["needs_context", "brief"]
                    }),
                ),
                (
                    "validate.schema.json".to_string(),
                    json!({
                        "type": "object",
                        "properties": {
                            "context": {"$ref": "context.schema.json"},
                            "outputs": {"type": "object"}
                        },
                        "required": ["context", "outputs"]
                    }),
                ),
            ]);

            let prompts = BTreeMap::from([(
                "execute".to_string(),
                "Write the activation brief for {{product.name}}.".to_string(),
            )]);

            Self {
                manifest,
                schemas,
                prompts,
            }
        }

        pub fn write(&self, root: &Path, dir_name: &str) {
            let dir = root.join(dir_name);
            std::fs::create_dir_all(dir.join("schemas")).unwrap();
            std::fs::write(
                dir.join("pack.json"),
                serde_json::to_string_pretty(&self.manifest).unwrap(),
            )
            .unwrap();
            for (name, schema) in &self.schemas {
                std::fs::write(
                    dir.join("schemas").join(name),
                    serde_json::to_string_pretty(schema).unwrap(),
                )
                .unwrap();
            }
            if !self.prompts.is_empty() {
                std::fs::create_dir_all(dir.join("prompts")).unwrap();
                for (method, body) in &self.prompts {
                    std::fs::write(dir.join("prompts").join(format!("{method}.md")), body).unwrap();
                }
            }
        }
    }
}
