//! `requirements` — the fields a caller must and should provide.

use async_trait::async_trait;
use packwarden_core::{BehaviorHook, HookCall, HookError, Method};
use serde_json::{Value, json};

pub struct RequirementsHook;

#[async_trait]
impl BehaviorHook for RequirementsHook {
    fn name(&self) -> &str {
        "builtin.requirements"
    }

    async fn invoke(&self, call: HookCall) -> Result<Value, HookError> {
        let pack = &call.pack;
        let required: Vec<String> = pack.required_fields.iter().map(ToString::to_string).collect();
        let recommended: Vec<String> = pack
            .recommended_fields
            .iter()
            .map(ToString::to_string)
            .collect();

        let mut notes = Vec::new();
        if pack.manifest.required_context_fields.is_some() {
            notes.push("Required fields are declared in pack.json.".to_string());
        } else if let Some(source) = derived_from(&call) {
            notes.push(format!(
                "Required fields are derived from the required keys of {source}."
            ));
        }
        notes.push(
            "If required fields are missing, plan, execute and validate return needs_context with missing_fields."
                .to_string(),
        );
        if let Some(root) = pack
            .method(Method::Validate)
            .and_then(|spec| spec.context_root.as_ref())
        {
            notes.push(format!("validate resolves required fields under '{root}'."));
        }

        Ok(json!({
            "required_fields": required,
            "recommended_fields": recommended,
            "notes": notes,
        }))
    }
}

fn derived_from(call: &HookCall) -> Option<String> {
    [Method::Plan, Method::Execute]
        .into_iter()
        .find_map(|m| call.pack.method(m))
        .map(|spec| spec.input.name().to_string())
}
