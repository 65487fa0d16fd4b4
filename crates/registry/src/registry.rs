//! Operation registry — one dispatchable operation per (pack, method).

use packwarden_core::operation::{operation_id, tool_name};
use packwarden_core::{BehaviorHook, HookTable, Method, MethodSpec, PackDescriptor};
use packwarden_schema::{FieldPath, Schema};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::loader::{LoadIssue, LoadResult};

/// A dispatchable operation.
#[derive(Clone)]
pub struct OperationEntry {
    pub operation_id: String,
    /// Transport-safe alias; `None` when it collided with another.
    pub tool_name: Option<String>,
    pub pack: Arc<PackDescriptor>,
    pub method: Method,
    pub spec: MethodSpec,
    pub description: String,
    pub hook: Arc<dyn BehaviorHook>,
}

impl OperationEntry {
    pub fn pack_id(&self) -> &str {
        self.pack.pack_id()
    }

    pub fn input_schema(&self) -> &Schema {
        &self.spec.input
    }

    pub fn output_schema(&self) -> Option<&Schema> {
        self.spec.output.as_ref()
    }

    pub fn context_root(&self) -> Option<&FieldPath> {
        self.spec.context_root.as_ref()
    }

    /// Fields this operation gates on, as a caller must supply them.
    pub fn required_fields(&self) -> Vec<FieldPath> {
        if !self.method.is_gated() {
            return Vec::new();
        }
        match self.context_root() {
            Some(root) => self.pack.required_fields.iter().map(|f| root.join(f)).collect(),
            None => self.pack.required_fields.clone(),
        }
    }

    pub fn info(&self) -> OperationInfo {
        OperationInfo {
            operation_id: self.operation_id.clone(),
            tool_name: self.tool_name.clone(),
            pack_id: self.pack_id().to_string(),
            method: self.method,
            description: self.description.clone(),
            input_schema: self.input_schema().document().clone(),
            output_schema: self.output_schema().map(|s| s.document().clone()),
            required_fields: self.required_fields(),
            hook: self.hook.name().to_string(),
        }
    }
}

impl std::fmt::Debug for OperationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationEntry")
            .field("operation_id", &self.operation_id)
            .field("tool_name", &self.tool_name)
            .field("method", &self.method)
            .field("hook", &self.hook.name())
            .finish()
    }
}

/// The discovery view of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationInfo {
    pub operation_id: String,
    pub tool_name: Option<String>,
    pub pack_id: String,
    pub method: Method,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Option<Value>,
    pub required_fields: Vec<FieldPath>,
    pub hook: String,
}

/// An immutable index of every dispatchable operation.
#[derive(Debug, Default)]
pub struct Registry {
    root: PathBuf,
    packs: BTreeMap<String, Arc<PackDescriptor>>,
    operations: BTreeMap<String, OperationEntry>,
    aliases: HashMap<String, String>,
    report: Vec<LoadIssue>,
}

impl Registry {
    /// Index a load result, binding every operation to a hook.
    pub fn build(load: LoadResult, hooks: &HookTable) -> Self {
        let LoadResult {
            root,
            descriptors,
            errors,
        } = load;
        let mut report = errors;
        let mut operations = BTreeMap::new();

        for pack in descriptors.values() {
            for (&method, spec) in &pack.methods {
                let id = operation_id(pack.pack_id(), method);
                let Some(hook) = hooks.resolve(pack.pack_id(), method) else {
                    warn!(operation = %id, "No behavior hook bound; operation excluded");
                    report.push(LoadIssue::new(
                        pack.dir_name(),
                        format!("no behavior hook bound for '{id}'"),
                    ));
                    continue;
                };
                let entry = OperationEntry {
                    operation_id: id.clone(),
                    tool_name: Some(tool_name(pack.pack_id(), method)),
                    pack: Arc::clone(pack),
                    method,
                    spec: spec.clone(),
                    description: describe_operation(pack, method),
                    hook,
                };
                operations.insert(id, entry);
            }
        }

        let aliases = assign_aliases(&mut operations, &mut report);
        report.sort();

        info!(
            packs = descriptors.len(),
            operations = operations.len(),
            issues = report.len(),
            "Registry built"
        );

        Self {
            root,
            packs: descriptors,
            operations,
            aliases,
            report,
        }
    }

    /// Resolve a canonical operation id or a tool-name alias.
    pub fn resolve(&self, name: &str) -> Option<&OperationEntry> {
        self.operations.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|id| self.operations.get(id))
        })
    }

    /// Every operation, sorted by operation id.
    pub fn list(&self) -> Vec<OperationInfo> {
        self.operations.values().map(OperationEntry::info).collect()
    }

    pub fn operations(&self) -> impl Iterator<Item = &OperationEntry> {
        self.operations.values()
    }

    pub fn pack(&self, pack_id: &str) -> Option<&Arc<PackDescriptor>> {
        self.packs.get(pack_id)
    }

    pub fn packs(&self) -> impl Iterator<Item = &Arc<PackDescriptor>> {
        self.packs.values()
    }

    /// Loader errors plus issues found while building.
    pub fn report(&self) -> &[LoadIssue] {
        &self.report
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

// ── Internal ──

/// Drop every alias shared by more than one operation.
fn assign_aliases(
    operations: &mut BTreeMap<String, OperationEntry>,
    report: &mut Vec<LoadIssue>,
) -> HashMap<String, String> {
    let mut claims: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in operations.values() {
        if let Some(alias) = &entry.tool_name {
            claims.entry(alias.clone()).or_default().push(entry.operation_id.clone());
        }
    }

    let mut aliases = HashMap::new();
    for (alias, ids) in claims {
        if ids.len() == 1 {
            if let Some(id) = ids.into_iter().next() {
                aliases.insert(alias, id);
            }
            continue;
        }
        warn!(tool_name = %alias, operations = ?ids, "Tool name collision; alias dropped");
        for id in &ids {
            if let Some(entry) = operations.get_mut(id) {
                entry.tool_name = None;
                report.push(LoadIssue::new(
                    entry.pack.dir_name(),
                    format!("tool name '{alias}' collides between {}; alias dropped", ids.join(", ")),
                ));
            }
        }
    }
    aliases
}

fn describe_operation(pack: &PackDescriptor, method: Method) -> String {
    let name = &pack.manifest.name;
    match method {
        Method::Describe => format!("Return identity and selection metadata for pack '{name}'."),
        Method::Requirements => {
            format!("Return required and recommended context fields for pack '{name}'.")
        }
        Method::Plan => format!(
            "Create a plan for '{name}'. Returns needs_context if required fields are missing."
        ),
        Method::Execute => format!(
            "Produce the '{name}' brief from the provided context. Returns needs_context if required fields are missing."
        ),
        Method::Validate => format!(
            "Check outputs produced by '{name}' against its quality gates. Input is {{context, outputs}}."
        ),
    }
}
