//! `plan` — the manifest's plan steps, rendered against the context.

use async_trait::async_trait;
use packwarden_core::event::kind;
use packwarden_core::{BehaviorHook, HookCall, HookError, PlanStep};
use serde_json::{Value, json};

use crate::telemetry::{pack_event, to_values};
use crate::template::render;

pub struct PlanHook;

#[async_trait]
impl BehaviorHook for PlanHook {
    fn name(&self) -> &str {
        "builtin.plan"
    }

    async fn invoke(&self, call: HookCall) -> Result<Value, HookError> {
        let mut unresolved: Vec<String> = Vec::new();
        let steps: Vec<Value> = call
            .pack
            .manifest
            .plan_steps
            .iter()
            .map(|step| render_step(step, &call.context, &mut unresolved))
            .collect();

        let event = pack_event(
            &call.pack,
            kind::PLAN_GENERATED,
            &call.correlation_id,
            json!({"steps": steps.len(), "unresolved_placeholders": unresolved.len()}),
        );

        Ok(json!({
            "needs_context": false,
            "missing_fields": [],
            "assumptions": assumptions(&unresolved),
            "plan_steps": steps,
            "telemetry_events": to_values(&[event]),
        }))
    }
}

fn render_step(step: &PlanStep, context: &Value, unresolved: &mut Vec<String>) -> Value {
    let mut text = |template: &str| {
        let rendered = render(template, context);
        for key in rendered.unresolved {
            if !unresolved.contains(&key) {
                unresolved.push(key);
            }
        }
        rendered.text
    };

    json!({
        "step_id": step.step_id,
        "title": text(&step.title),
        "rationale": text(&step.rationale),
        "success_check": text(&step.success_check),
        "inputs_needed": step.inputs_needed,
        "outputs_produced": step.outputs_produced,
    })
}

/// One assumption per placeholder the context could not fill.
pub(crate) fn assumptions(unresolved: &[String]) -> Vec<String> {
    unresolved
        .iter()
        .map(|key| format!("'{key}' was not provided; '{{{{{key}}}}}' left unfilled."))
        .collect()
}
