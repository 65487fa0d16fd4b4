//! Schema validation for Packwarden packs.
//!
//! Every pack ships JSON Schema documents under its `schemas/` directory.
//! This crate turns those documents into compiled [`Schema`] values once,
//! at load time, and validates call contexts and hook outputs against them.
//!
//! - [`FieldPath`] — dotted/bracketed paths (`a.b[0].c`) used both for
//!   required-field gating and for reporting where a violation occurred
//! - [`SchemaSource`] — reads a pack's schema files and inlines `$ref`s
//!   between documents of the same pack
//! - [`Schema`] / [`validate`] — Draft 7 validation that collects every
//!   violation instead of stopping at the first one

mod path;
mod refs;
mod validator;

pub use path::{FieldPath, PathError, Segment};
pub use refs::SchemaSource;
pub use validator::{Schema, ValidationResult, Violation, validate};

/// Errors raised while reading, resolving, or compiling schema documents.
///
/// These are always load-time errors: a pack whose schemas fail here is
/// excluded from the registry. Validating a *value* never produces one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing schema file: {0}")]
    MissingFile(String),

    #[error("unreadable schema file {file}: {reason}")]
    Unreadable { file: String, reason: String },

    #[error("invalid JSON in schema file {file}: {reason}")]
    Parse { file: String, reason: String },

    #[error("invalid schema {file}: {reason}")]
    Invalid { file: String, reason: String },

    #[error("unresolved $ref '{reference}' in {file}")]
    UnresolvedRef { file: String, reference: String },

    #[error("recursive $ref '{reference}' in {file}")]
    RecursiveRef { file: String, reference: String },

    #[error(
        "unsupported $ref '{reference}' in {file}: only files in the pack's schemas/ directory can be referenced"
    )]
    UnsupportedRef { file: String, reference: String },
}
