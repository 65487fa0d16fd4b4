//! # Packwarden Core
//!
//! Domain types, traits, and error definitions for the Packwarden pack
//! registry. This crate knows nothing about the filesystem layout or the
//! transports; it defines the model the loader, registry, hooks and
//! gateway all build against.
//!
//! ## Model
//!
//! A pack directory carries a [`PackManifest`]. The loader turns it into a
//! [`PackDescriptor`] with compiled schemas. Every declared [`Method`]
//! becomes an operation named by [`operation::operation_id`], served by a
//! [`BehaviorHook`] resolved through a [`HookTable`], and every call ends
//! in a [`DispatchResult`].

pub mod error;
pub mod event;
pub mod hook;
pub mod manifest;
pub mod method;
pub mod operation;
pub mod pack;
pub mod result;

// Re-export key types at crate root for ergonomics
pub use error::{Error, HookError, LoadError, ManifestError, Result};
pub use event::{EventBus, PackEvent};
pub use hook::{BehaviorHook, HookCall, HookTable};
pub use manifest::{GateRule, PackManifest, PlanStep, QualityGate, SchemaRefs};
pub use method::Method;
pub use operation::{operation_id, parse_operation_id, tool_name};
pub use pack::{MethodSpec, PackDescriptor, PackSummary};
pub use result::DispatchResult;
