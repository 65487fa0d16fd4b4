//! Dispatch engine — runs one call through the gating pipeline.
//!
//! Stages run in a fixed order and the first failure is terminal:
//!
//! 1. resolve the operation (`unknown`)
//! 2. required-field gating, for `plan`/`execute`/`validate` (`needs_context`)
//! 3. input schema validation (`invalid_context`)
//! 4. hook invocation; errors and panics are caught (`hook_failed`)
//! 5. output schema validation (`invalid_output`)
//!
//! Anything that survives all five is returned verbatim as `ok`.

use futures::FutureExt;
use packwarden_core::event::kind;
use packwarden_core::{DispatchResult, EventBus, HookCall, PackEvent};
use packwarden_schema::FieldPath;
use serde_json::{Value, json};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::handle::RegistryHandle;
use crate::registry::{OperationEntry, Registry};

/// Executes operations against the live registry.
pub struct DispatchEngine {
    registry: Arc<RegistryHandle>,
    events: Arc<EventBus>,
}

impl DispatchEngine {
    pub fn new(registry: Arc<RegistryHandle>) -> Self {
        Self {
            registry,
            events: Arc::new(EventBus::default()),
        }
    }

    /// Publish call outcomes on a shared bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn registry(&self) -> &Arc<RegistryHandle> {
        &self.registry
    }

    /// Dispatch `name` (an operation id or tool-name alias) with `context`.
    pub async fn dispatch(&self, name: &str, context: Value) -> DispatchResult {
        let registry = self.registry.current();
        let correlation_id = Uuid::new_v4().to_string();
        let result = dispatch_on(&registry, name, context, &correlation_id).await;
        self.publish(&registry, name, &correlation_id, &result);
        result
    }

    fn publish(&self, registry: &Registry, name: &str, correlation_id: &str, result: &DispatchResult) {
        let entry = registry.resolve(name);
        let (pack_id, version) = entry
            .map(|e| (e.pack_id().to_string(), e.pack.version().to_string()))
            .unwrap_or_default();
        let operation = entry.map_or(name, |e| e.operation_id.as_str());

        let (event_type, details) = match result {
            DispatchResult::Unknown { .. } => (kind::UNKNOWN_OPERATION, json!({"operation": name})),
            DispatchResult::NeedsContext { missing_fields } => (
                kind::NEEDS_CONTEXT,
                json!({"operation": operation, "missing_fields": missing_fields}),
            ),
            DispatchResult::InvalidContext { violations } => (
                kind::CONTEXT_REJECTED,
                json!({"operation": operation, "violations": violations.len()}),
            ),
            DispatchResult::InvalidOutput { violations } => (
                kind::OUTPUT_REJECTED,
                json!({"operation": operation, "violations": violations.len()}),
            ),
            DispatchResult::HookFailed { reason } => (
                kind::HOOK_FAILED,
                json!({"operation": operation, "reason": reason}),
            ),
            DispatchResult::Ok { .. } => (kind::OPERATION_COMPLETED, json!({"operation": operation})),
        };
        self.events.publish(PackEvent::new(
            event_type,
            pack_id,
            version,
            correlation_id,
            details,
        ));
    }
}

/// Run the pipeline against one registry snapshot.
pub async fn dispatch_on(
    registry: &Registry,
    name: &str,
    context: Value,
    correlation_id: &str,
) -> DispatchResult {
    let Some(entry) = registry.resolve(name) else {
        info!(operation = %name, correlation_id, "Unknown operation");
        return DispatchResult::Unknown {
            operation_id: name.to_string(),
        };
    };
    let operation = entry.operation_id.as_str();

    if entry.method.is_gated() {
        let missing = missing_fields(entry, &context);
        if !missing.is_empty() {
            let fields: Vec<String> = missing.iter().map(ToString::to_string).collect();
            info!(operation, correlation_id, missing = ?fields, "Context is missing required fields");
            return DispatchResult::NeedsContext {
                missing_fields: missing,
            };
        }
    }

    let checked = entry.input_schema().validate(&context);
    if !checked.ok {
        info!(
            operation,
            correlation_id,
            violations = checked.violations.len(),
            "Context failed input schema"
        );
        return DispatchResult::InvalidContext {
            violations: checked.violations,
        };
    }

    let call = HookCall {
        pack: Arc::clone(&entry.pack),
        method: entry.method,
        context,
        correlation_id: correlation_id.to_string(),
    };
    debug!(operation, correlation_id, hook = %entry.hook.name(), "Invoking hook");
    let output = match AssertUnwindSafe(entry.hook.invoke(call)).catch_unwind().await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(operation, correlation_id, error = %e, "Hook failed");
            return DispatchResult::HookFailed {
                reason: e.to_string(),
            };
        }
        Err(panic) => {
            let reason = format!("hook panicked: {}", panic_message(panic.as_ref()));
            warn!(operation, correlation_id, %reason, "Hook panicked");
            return DispatchResult::HookFailed { reason };
        }
    };

    if let Some(schema) = entry.output_schema() {
        let checked = schema.validate(&output);
        if !checked.ok {
            warn!(
                operation,
                correlation_id,
                violations = checked.violations.len(),
                "Hook output failed output schema"
            );
            return DispatchResult::InvalidOutput {
                violations: checked.violations,
            };
        }
    }

    info!(operation, correlation_id, "Operation completed");
    DispatchResult::Ok { output }
}

/// Required fields that are absent or null, in declaration order.
///
/// A field below another missing field is implied by it and not listed.
fn missing_fields(entry: &OperationEntry, context: &Value) -> Vec<FieldPath> {
    let absent: Vec<FieldPath> = entry
        .required_fields()
        .into_iter()
        .filter(|field| !field.is_present(context))
        .collect();

    let mut missing: Vec<FieldPath> = Vec::new();
    for field in &absent {
        let implied = absent
            .iter()
            .any(|other| other != field && field.starts_with(other));
        if !implied && !missing.contains(field) {
            missing.push(field.clone());
        }
    }
    missing
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::PackFixture;
    use async_trait::async_trait;
    use packwarden_core::{BehaviorHook, HookError, HookTable, Method};
    use packwarden_hooks::default_hooks;
    use std::path::Path;

    fn engine(root: &Path, hooks: HookTable) -> DispatchEngine {
        DispatchEngine::new(Arc::new(RegistryHandle::load(root, hooks).unwrap()))
    }

    fn standard() -> (tempfile::TempDir, DispatchEngine) {
        let tmp = tempfile::tempdir().unwrap();
        PackFixture::standard("growth.plg").write(tmp.path(), "growth.plg-1.0.0");
        let engine = engine(tmp.path(), default_hooks());
        (tmp, engine)
    }

    fn full_context() -> Value {
        json!({
            "product": {"name": "Acme", "trial_type": "free_trial"},
            "funnel": {"stages": ["signup", "activation"]}
        })
    }

    fn missing(result: &DispatchResult) -> Vec<String> {
        match result {
            DispatchResult::NeedsContext { missing_fields } => {
                missing_fields.iter().map(ToString::to_string).collect()
            }
            other => panic!("expected needs_context, got {other:?}"),
        }
    }

    struct Fixed(Value);

    #[async_trait]
    impl BehaviorHook for Fixed {
        fn name(&self) -> &str {
            "test.fixed"
        }
        async fn invoke(&self, _call: HookCall) -> Result<Value, HookError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl BehaviorHook for Failing {
        fn name(&self) -> &str {
            "test.failing"
        }
        async fn invoke(&self, _call: HookCall) -> Result<Value, HookError> {
            Err(HookError::Failed("upstream unavailable".into()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl BehaviorHook for Panicking {
        fn name(&self) -> &str {
            "test.panicking"
        }
        async fn invoke(&self, _call: HookCall) -> Result<Value, HookError> {
            panic!("hook exploded");
        }
    }

    #[tokio::test]
    async fn plan_with_full_context_is_ok() {
        let (_tmp, engine) = standard();
        let result = engine.dispatch("pack.growth.plg.plan", full_context()).await;
        let output = result.output().unwrap();
        assert_eq!(output["needs_context"], false);
        assert_eq!(output["plan_steps"][0]["title"], "Confirm activation for Acme");
    }

    #[tokio::test]
    async fn aliases_dispatch_like_ids() {
        let (_tmp, engine) = standard();
        let result = engine.dispatch("pack__growth_plg__plan", full_context()).await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn unknown_operation_ignores_context() {
        let (_tmp, engine) = standard();
        for context in [json!({}), full_context(), json!(null)] {
            assert_eq!(
                engine.dispatch("pack.ghost.plan", context).await,
                DispatchResult::Unknown {
                    operation_id: "pack.ghost.plan".into()
                }
            );
        }
    }

    #[tokio::test]
    async fn removing_one_required_field_names_exactly_it() {
        let (_tmp, engine) = standard();
        for field in ["product.name", "funnel.stages"] {
            let mut context = full_context();
            let (parent, leaf) = field.split_once('.').unwrap();
            context[parent].as_object_mut().unwrap().remove(leaf);
            let result = engine.dispatch("pack.growth.plg.execute", context).await;
            assert_eq!(missing(&result), vec![field]);
        }
    }

    #[tokio::test]
    async fn missing_parent_hides_its_children() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pack = PackFixture::standard("p");
        pack.manifest
            .as_object_mut()
            .unwrap()
            .remove("required_context_fields");
        pack.write(tmp.path(), "p");
        let engine = engine(tmp.path(), default_hooks());

        // Derived: product, product.name, funnel, funnel.stages.
        let cases = [
            ("product", None),
            ("product", Some("name")),
            ("funnel", None),
            ("funnel", Some("stages")),
        ];
        for (parent, leaf) in cases {
            let mut context = full_context();
            let expected = match leaf {
                Some(leaf) => {
                    context[parent].as_object_mut().unwrap().remove(leaf);
                    format!("{parent}.{leaf}")
                }
                None => {
                    context.as_object_mut().unwrap().remove(parent);
                    parent.to_string()
                }
            };
            let result = engine.dispatch("pack.p.execute", context).await;
            assert_eq!(missing(&result), vec![expected]);
        }

        let result = engine.dispatch("pack.p.execute", json!({})).await;
        assert_eq!(missing(&result), vec!["product", "funnel"]);
    }

    #[tokio::test]
    async fn builtin_validate_input_rejects_malformed_calls() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pack = PackFixture::standard("p");
        pack.manifest["schema_refs"]
            .as_object_mut()
            .unwrap()
            .remove("validate");
        pack.schemas.remove("validate.schema.json");
        pack.write(tmp.path(), "p");
        let engine = engine(tmp.path(), default_hooks());

        let result = engine
            .dispatch("pack.p.validate", json!({"context": full_context(), "outputs": []}))
            .await;
        let DispatchResult::InvalidContext { violations } = result else {
            panic!("expected invalid_context, got {result:?}");
        };
        assert_eq!(violations[0].path.to_string(), "outputs");

        let result = engine
            .dispatch("pack.p.validate", json!({"outputs": {}}))
            .await;
        assert_eq!(
            missing(&result),
            vec!["context.product.name", "context.funnel.stages"]
        );

        let result = engine
            .dispatch("pack.p.validate", json!({"context": full_context(), "outputs": {}}))
            .await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn null_counts_as_missing() {
        let (_tmp, engine) = standard();
        let mut context = full_context();
        context["product"]["name"] = Value::Null;
        let result = engine.dispatch("pack.growth.plg.plan", context).await;
        assert_eq!(missing(&result), vec!["product.name"]);
    }

    #[tokio::test]
    async fn missing_fields_follow_manifest_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pack = PackFixture::standard("p");
        pack.manifest["required_context_fields"] = json!(["a.b", "c", "$.a.b"]);
        pack.schemas.insert("context.schema.json".into(), json!({"type": "object"}));
        pack.write(tmp.path(), "p");
        let engine = engine(tmp.path(), default_hooks());

        let result = engine.dispatch("pack.p.plan", json!({"a": {}})).await;
        assert_eq!(missing(&result), vec!["a.b", "c"]);
    }

    #[tokio::test]
    async fn gating_runs_before_schema_validation() {
        let (_tmp, engine) = standard();
        // Both missing fields and a type error: gating wins.
        let context = json!({"product": {"trial_type": 7}, "funnel": {"stages": []}});
        let result = engine.dispatch("pack.growth.plg.plan", context).await;
        assert_eq!(missing(&result), vec!["product.name"]);
    }

    #[tokio::test]
    async fn schema_violation_points_at_field() {
        let (_tmp, engine) = standard();
        let mut context = full_context();
        context["product"]["trial_type"] = json!("lifetime");
        let result = engine.dispatch("pack.growth.plg.plan", context).await;
        let DispatchResult::InvalidContext { violations } = result else {
            panic!("expected invalid_context, got {result:?}");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path.to_string(), "product.trial_type");
        assert_eq!(violations[0].keyword, "enum");
    }

    #[tokio::test]
    async fn describe_and_requirements_skip_gating() {
        let (_tmp, engine) = standard();
        for op in ["pack.growth.plg.describe", "pack.growth.plg.requirements"] {
            let result = engine.dispatch(op, json!({})).await;
            assert!(result.is_ok(), "{op}: {result:?}");
        }
        let requirements = engine
            .dispatch("pack.growth.plg.requirements", json!({}))
            .await;
        assert_eq!(
            requirements.output().unwrap()["required_fields"],
            json!(["product.name", "funnel.stages"])
        );
    }

    #[tokio::test]
    async fn validate_gates_under_context_root() {
        let (_tmp, engine) = standard();
        let result = engine
            .dispatch(
                "pack.growth.plg.validate",
                json!({"context": {"product": {"name": "Acme"}}, "outputs": {}}),
            )
            .await;
        assert_eq!(missing(&result), vec!["context.funnel.stages"]);

        let result = engine
            .dispatch(
                "pack.growth.plg.validate",
                json!({"context": full_context(), "outputs": {"needs_context": false, "brief": "x"}}),
            )
            .await;
        assert_eq!(result.output().unwrap()["passed"], true, "{result:?}");
    }

    #[tokio::test]
    async fn output_schema_violations_are_invalid_output() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pack = PackFixture::standard("p");
        pack.schemas.insert(
            "output.schema.json".into(),
            json!({
                "type": "object",
                "properties": {"plan": {"type": "array"}},
                "required": ["plan"]
            }),
        );
        pack.write(tmp.path(), "p");
        let mut hooks = default_hooks();
        hooks.register("p", Method::Execute, Arc::new(Fixed(json!({"plan": "not-an-array"}))));
        let engine = engine(tmp.path(), hooks);

        let result = engine.dispatch("pack.p.execute", full_context()).await;
        let DispatchResult::InvalidOutput { violations } = result else {
            panic!("expected invalid_output, got {result:?}");
        };
        assert_eq!(violations[0].path.to_string(), "plan");
    }

    #[tokio::test]
    async fn hook_errors_and_panics_are_hook_failed() {
        let tmp = tempfile::tempdir().unwrap();
        PackFixture::standard("p").write(tmp.path(), "p");
        let mut hooks = default_hooks();
        hooks.register("p", Method::Plan, Arc::new(Failing));
        hooks.register("p", Method::Execute, Arc::new(Panicking));
        let engine = engine(tmp.path(), hooks);

        assert_eq!(
            engine.dispatch("pack.p.plan", full_context()).await,
            DispatchResult::HookFailed {
                reason: "upstream unavailable".into()
            }
        );
        assert_eq!(
            engine.dispatch("pack.p.execute", full_context()).await,
            DispatchResult::HookFailed {
                reason: "hook panicked: hook exploded".into()
            }
        );
        // The engine keeps serving after a panic.
        assert!(engine.dispatch("pack.p.describe", json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn dispatch_is_deterministic() {
        let (_tmp, engine) = standard();
        let context = json!({"product": {"name": 1}, "funnel": {}});
        let first = engine.dispatch("pack.growth.plg.plan", context.clone()).await;
        let second = engine.dispatch("pack.growth.plg.plan", context).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn outcomes_are_published() {
        let (_tmp, engine) = standard();
        let mut rx = engine.events().subscribe();

        engine.dispatch("pack.growth.plg.plan", json!({})).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "needs_context");
        assert_eq!(event.pack_id, "growth.plg");
        assert_eq!(event.version, "1.0.0");
        assert!(Uuid::parse_str(&event.correlation_id).is_ok());

        engine.dispatch("pack.ghost.plan", json!({})).await;
        assert_eq!(rx.recv().await.unwrap().event_type, "unknown_operation");
    }
}
