//! `execute` — renders the pack's execute prompt into a brief.

use async_trait::async_trait;
use packwarden_core::event::kind;
use packwarden_core::{BehaviorHook, HookCall, HookError, Method};
use serde_json::{Value, json};

use crate::plan::assumptions;
use crate::telemetry::{pack_event, to_values};
use crate::template::render;

pub struct ExecuteHook;

#[async_trait]
impl BehaviorHook for ExecuteHook {
    fn name(&self) -> &str {
        "builtin.execute"
    }

    async fn invoke(&self, call: HookCall) -> Result<Value, HookError> {
        let pack = &call.pack;
        let prompt = pack
            .prompt(Method::Execute)
            .ok_or_else(|| HookError::MissingPrompt {
                pack_id: pack.pack_id().to_string(),
                method: Method::Execute,
            })?;

        let rendered = render(prompt, &call.context);
        let events = [
            pack_event(pack, kind::PACK_LOADED, &call.correlation_id, json!({"mode": "execute"})),
            pack_event(
                pack,
                kind::EXECUTION_COMPLETED,
                &call.correlation_id,
                json!({"unresolved_placeholders": rendered.unresolved.len()}),
            ),
        ];

        Ok(json!({
            "needs_context": false,
            "missing_fields": [],
            "assumptions": assumptions(&rendered.unresolved),
            "brief": rendered.text,
            "telemetry_events": to_values(&events),
        }))
    }
}
