//! Behavior hooks — the domain logic behind each pack method.
//!
//! The registry never interprets context itself. Each (pack, method) pair
//! is bound at build time to a [`BehaviorHook`] that receives context which
//! has already passed gating, and returns a value the dispatch engine then
//! checks against the method's output schema.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::HookError;
use crate::method::Method;
use crate::pack::PackDescriptor;

/// One invocation of a hook.
#[derive(Debug, Clone)]
pub struct HookCall {
    pub pack: Arc<PackDescriptor>,
    pub method: Method,
    /// The validated call context, passed through untouched.
    pub context: Value,
    pub correlation_id: String,
}

/// Given validated context, produce a value.
#[async_trait]
pub trait BehaviorHook: Send + Sync {
    /// A short name for logs and discovery (e.g., "builtin.plan").
    fn name(&self) -> &str;

    async fn invoke(&self, call: HookCall) -> std::result::Result<Value, HookError>;
}

/// Binds hooks to (pack_id, method) pairs.
///
/// A per-pack override wins over the per-method default.
#[derive(Clone, Default)]
pub struct HookTable {
    defaults: HashMap<Method, Arc<dyn BehaviorHook>>,
    overrides: HashMap<(String, Method), Arc<dyn BehaviorHook>>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hook used for `method` on every pack without an override.
    pub fn set_default(&mut self, method: Method, hook: Arc<dyn BehaviorHook>) {
        self.defaults.insert(method, hook);
    }

    /// Bind a hook to one pack's method. Replaces any earlier binding.
    pub fn register(&mut self, pack_id: impl Into<String>, method: Method, hook: Arc<dyn BehaviorHook>) {
        self.overrides.insert((pack_id.into(), method), hook);
    }

    pub fn resolve(&self, pack_id: &str, method: Method) -> Option<Arc<dyn BehaviorHook>> {
        self.overrides
            .get(&(pack_id.to_string(), method))
            .or_else(|| self.defaults.get(&method))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty() && self.overrides.is_empty()
    }
}

impl std::fmt::Debug for HookTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut defaults: Vec<_> = self
            .defaults
            .iter()
            .map(|(m, h)| format!("{m}={}", h.name()))
            .collect();
        defaults.sort();
        f.debug_struct("HookTable")
            .field("defaults", &defaults)
            .field("overrides", &self.overrides.len())
            .finish()
    }
}
