//! Pack loader — turns a directory of pack directories into descriptors.
//!
//! ```text
//! <root>/
//!   <pack_dir>/
//!     pack.json
//!     schemas/*.schema.json
//!     prompts/<method>.md      (optional)
//! ```
//!
//! A broken pack is excluded and reported; it never aborts the load. Only a
//! missing or unreadable root is fatal.

use packwarden_core::manifest::MANIFEST_FILE;
use packwarden_core::pack::{VALIDATE_CONTEXT_ROOT, builtin_input_schema, derive_required_fields};
use packwarden_core::{
    LoadError, ManifestError, Method, MethodSpec, PackDescriptor, PackManifest,
};
use packwarden_schema::{FieldPath, Schema, SchemaSource};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SCHEMAS_DIR: &str = "schemas";
pub const PROMPTS_DIR: &str = "prompts";

/// Why one pack directory was excluded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LoadIssue {
    /// Directory name under the packs root.
    pub pack_dir: String,
    pub reason: String,
}

impl LoadIssue {
    pub fn new(pack_dir: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pack_dir: pack_dir.into(),
            reason: reason.into(),
        }
    }
}

/// Every pack that loaded, plus every reason one did not.
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    pub root: PathBuf,
    pub descriptors: BTreeMap<String, Arc<PackDescriptor>>,
    pub errors: Vec<LoadIssue>,
}

/// Scan `root` and load every pack directory in it.
///
/// Directories are visited in sorted name order. When several directories
/// declare the same `pack_id`, none of them is registered.
pub fn load(root: &Path) -> Result<LoadResult, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::RootNotFound(root.to_path_buf()));
    }
    let entries = std::fs::read_dir(root).map_err(|e| LoadError::RootUnreadable {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut dirs: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            (!name.starts_with('.') && path.is_dir()).then_some((name, path))
        })
        .collect();
    dirs.sort();

    let mut errors = Vec::new();
    let mut by_id: BTreeMap<String, Vec<(String, PackDescriptor)>> = BTreeMap::new();
    for (name, path) in dirs {
        match load_pack(&path) {
            Ok(pack) => {
                debug!(pack_dir = %name, pack_id = %pack.pack_id(), "Parsed pack");
                by_id
                    .entry(pack.pack_id().to_string())
                    .or_default()
                    .push((name, pack));
            }
            Err(e) => {
                warn!(pack_dir = %name, error = %e, "Rejected pack");
                errors.push(LoadIssue::new(name, e.to_string()));
            }
        }
    }

    let mut descriptors = BTreeMap::new();
    for (pack_id, mut claimants) in by_id {
        if claimants.len() == 1 {
            if let Some((name, pack)) = claimants.pop() {
                info!(pack_id = %pack_id, pack_dir = %name, version = %pack.version(), "Loaded pack");
                descriptors.insert(pack_id, Arc::new(pack));
            }
            continue;
        }

        let names: Vec<&str> = claimants.iter().map(|(name, _)| name.as_str()).collect();
        for (name, _) in &claimants {
            let others: Vec<&str> = names.iter().copied().filter(|n| n != name).collect();
            let error = LoadError::DuplicatePackId {
                pack_id: pack_id.clone(),
                others: others.join(", "),
            };
            warn!(pack_dir = %name, error = %error, "Rejected pack");
            errors.push(LoadIssue::new(name.clone(), error.to_string()));
        }
    }
    errors.sort();

    Ok(LoadResult {
        root: root.to_path_buf(),
        descriptors,
        errors,
    })
}

/// Load a single pack directory.
pub fn load_pack(dir: &Path) -> Result<PackDescriptor, LoadError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(LoadError::MissingManifest);
    }
    let schemas_dir = dir.join(SCHEMAS_DIR);
    if !schemas_dir.is_dir() {
        return Err(LoadError::MissingSchemasDir);
    }

    let text = std::fs::read_to_string(&manifest_path)
        .map_err(|e| LoadError::UnreadableManifest(e.to_string()))?;
    let manifest = PackManifest::from_json(&text)?;

    let mut source = SchemaSource::new(schemas_dir);
    let mut methods = BTreeMap::new();
    for &method in &manifest.methods {
        let refs = manifest.schema_refs_for(method).cloned().unwrap_or_default();
        let input = match &refs.input {
            Some(file) => source.load(file)?,
            None => builtin_input_schema(method)
                .map(Schema::compile)
                .transpose()?
                .ok_or(ManifestError::MissingInputSchema(method))?,
        };
        let output = refs.output.as_deref().map(|f| source.load(f)).transpose()?;
        let context_root = match (refs.context_root, method) {
            (None, Method::Validate) if refs.input.is_none() => {
                Some(FieldPath::root().child(VALIDATE_CONTEXT_ROOT))
            }
            (root, _) => root,
        };
        methods.insert(
            method,
            MethodSpec {
                input,
                output,
                context_root,
            },
        );
    }

    let events_schema = manifest
        .events_schema
        .as_deref()
        .map(|f| source.load(f))
        .transpose()?;

    let required_fields = match &manifest.required_context_fields {
        Some(fields) => fields.clone(),
        None => [Method::Plan, Method::Execute]
            .into_iter()
            .find_map(|m| methods.get(&m))
            .map(|spec: &MethodSpec| derive_required_fields(spec.input.document()))
            .unwrap_or_default(),
    };

    let mut prompts = BTreeMap::new();
    for &method in &manifest.methods {
        let file = format!("{method}.md");
        let path = dir.join(PROMPTS_DIR).join(&file);
        if !path.is_file() {
            continue;
        }
        let body = std::fs::read_to_string(&path).map_err(|e| LoadError::UnreadablePrompt {
            file: format!("{PROMPTS_DIR}/{file}"),
            reason: e.to_string(),
        })?;
        prompts.insert(method, body);
    }

    Ok(PackDescriptor {
        recommended_fields: manifest.recommended_context_fields.clone(),
        manifest,
        dir: dir.to_path_buf(),
        methods,
        required_fields,
        events_schema,
        prompts,
    })
}
