//! Built-in behavior hooks for Packwarden.
//!
//! These are the data-driven implementations every pack gets unless a
//! custom hook is registered for it: `describe` and `requirements` report
//! manifest metadata, `plan` and `execute` render manifest steps and
//! prompts against the caller's context, and `validate` runs quality gates
//! over an `execute` result.

pub mod describe;
pub mod execute;
pub mod plan;
pub mod requirements;
pub mod telemetry;
pub mod template;
pub mod validate;

use packwarden_core::{HookTable, Method};
use std::sync::Arc;

pub use describe::DescribeHook;
pub use execute::ExecuteHook;
pub use plan::PlanHook;
pub use requirements::RequirementsHook;
pub use validate::ValidateHook;

/// A hook table with the built-in hook set as per-method defaults.
pub fn default_hooks() -> HookTable {
    let mut table = HookTable::new();
    table.set_default(Method::Describe, Arc::new(DescribeHook));
    table.set_default(Method::Requirements, Arc::new(RequirementsHook));
    table.set_default(Method::Plan, Arc::new(PlanHook));
    table.set_default(Method::Execute, Arc::new(ExecuteHook));
    table.set_default(Method::Validate, Arc::new(ValidateHook));
    table
}
