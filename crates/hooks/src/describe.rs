//! `describe` — identity and selection metadata from the manifest.

use async_trait::async_trait;
use packwarden_core::{BehaviorHook, HookCall, HookError};
use serde_json::{Value, json};

pub struct DescribeHook;

#[async_trait]
impl BehaviorHook for DescribeHook {
    fn name(&self) -> &str {
        "builtin.describe"
    }

    async fn invoke(&self, call: HookCall) -> Result<Value, HookError> {
        let manifest = &call.pack.manifest;
        Ok(json!({
            "pack_id": manifest.pack_id,
            "name": manifest.name,
            "version": manifest.version,
            "summary": manifest.summary,
            "domain_tags": manifest.domain_tags,
            "primary_outcomes": manifest.primary_outcomes,
            "trigger_hints": manifest.trigger_hints(),
        }))
    }
}
