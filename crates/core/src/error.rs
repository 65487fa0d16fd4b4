//! Error types for the Packwarden domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; per-pack failures are
//! collected into load reports rather than aborting a load.

use packwarden_schema::{PathError, SchemaError};
use std::path::PathBuf;
use thiserror::Error;

use crate::method::Method;

/// The top-level error type for Packwarden operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Loading ---
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    // --- Behavior hooks ---
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Problems with a single `pack.json`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("invalid manifest JSON: {0}")]
    Parse(String),

    #[error("manifest must be a JSON object")]
    NotAnObject,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("invalid pack_id '{pack_id}': must match [A-Za-z0-9._-]+")]
    InvalidPackId { pack_id: String },

    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("methods must list at least one method")]
    NoMethods,

    #[error("duplicate method '{0}'")]
    DuplicateMethod(Method),

    #[error("method '{0}' declares no input schema")]
    MissingInputSchema(Method),

    #[error("schema ref for undeclared method '{0}'")]
    UndeclaredSchemaRef(Method),

    #[error(transparent)]
    InvalidPath(#[from] PathError),
}

/// Why a pack directory (or the whole packs root) could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The only fatal case: there is nothing to scan.
    #[error("packs directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("unreadable packs directory {}: {reason}", .path.display())]
    RootUnreadable { path: PathBuf, reason: String },

    #[error("missing manifest: pack.json")]
    MissingManifest,

    #[error("missing schemas directory")]
    MissingSchemasDir,

    #[error("unreadable manifest: {0}")]
    UnreadableManifest(String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("unreadable prompt {file}: {reason}")]
    UnreadablePrompt { file: String, reason: String },

    #[error("duplicate pack_id '{pack_id}' also declared in {others}")]
    DuplicatePackId { pack_id: String, others: String },
}

impl LoadError {
    /// Whether this error aborts the whole load rather than one pack.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::RootNotFound(_) | LoadError::RootUnreadable { .. })
    }
}

/// Failures raised by behavior hooks. Reported to callers as `hook_failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("pack '{pack_id}' has no {method} prompt")]
    MissingPrompt { pack_id: String, method: Method },

    #[error("invalid hook input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Failed(String),
}
