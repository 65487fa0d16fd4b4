//! `validate` — quality gates over a previous `execute` result.
//!
//! Input is `{context, outputs}`. Every gate runs; `passed` is true only
//! when none of them reported an issue.

use async_trait::async_trait;
use packwarden_core::{BehaviorHook, GateRule, HookCall, HookError, Method, QualityGate};
use serde::Serialize;
use serde_json::{Value, json};

pub struct ValidateHook;

/// Keys that describe a result rather than being an artifact of it.
const ENVELOPE_KEYS: [&str; 4] = ["needs_context", "missing_fields", "assumptions", "telemetry_events"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum GateStatus {
    Pass,
    Fail,
}

#[derive(Debug, Serialize)]
struct GateReport {
    gate: String,
    status: GateStatus,
    evidence: String,
}

#[derive(Default)]
struct Report {
    issues: Vec<String>,
    fixes: Vec<String>,
    gates: Vec<GateReport>,
}

impl Report {
    fn pass(&mut self, gate: &str, evidence: impl Into<String>) {
        self.gates.push(GateReport {
            gate: gate.to_string(),
            status: GateStatus::Pass,
            evidence: evidence.into(),
        });
    }

    fn fail(&mut self, gate: &str, evidence: impl Into<String>, issue: String, fix: String) {
        self.issues.push(issue);
        if !self.fixes.contains(&fix) {
            self.fixes.push(fix);
        }
        self.gates.push(GateReport {
            gate: gate.to_string(),
            status: GateStatus::Fail,
            evidence: evidence.into(),
        });
    }
}

#[async_trait]
impl BehaviorHook for ValidateHook {
    fn name(&self) -> &str {
        "builtin.validate"
    }

    async fn invoke(&self, call: HookCall) -> Result<Value, HookError> {
        let Some(input) = call.context.as_object() else {
            return Err(HookError::InvalidInput("validate expects {context, outputs}".into()));
        };
        let Some(outputs) = input.get("outputs").filter(|v| v.is_object()) else {
            return Err(HookError::InvalidInput("'outputs' must be an object".into()));
        };
        if !input.get("context").is_some_and(Value::is_object) {
            return Err(HookError::InvalidInput("'context' must be an object".into()));
        }

        let mut report = Report::default();
        output_schema_gate(&call, outputs, &mut report);
        needs_context_gate(outputs, &mut report);
        for gate in &call.pack.manifest.quality_gates {
            manifest_gate(gate, outputs, &mut report);
        }

        Ok(json!({
            "passed": report.issues.is_empty(),
            "issues": report.issues,
            "fixes": report.fixes,
            "quality_gates": report.gates,
        }))
    }
}

/// `outputs` must conform to the pack's `execute` output schema.
fn output_schema_gate(call: &HookCall, outputs: &Value, report: &mut Report) {
    const GATE: &str = "output_schema";
    let Some(schema) = call
        .pack
        .method(Method::Execute)
        .and_then(|spec| spec.output.as_ref())
    else {
        report.pass(GATE, "no execute output schema declared");
        return;
    };

    let result = schema.validate(outputs);
    if result.ok {
        report.pass(GATE, format!("outputs conform to {}", schema.name()));
        return;
    }
    for violation in &result.violations {
        report.issues.push(format!("outputs.{}: {}", violation.path, violation.message));
    }
    report.fixes.push(format!("Make outputs conform to {}.", schema.name()));
    report.gates.push(GateReport {
        gate: GATE.to_string(),
        status: GateStatus::Fail,
        evidence: format!("violations={}", result.violations.len()),
    });
}

/// A result that asks for more context must not also carry artifacts.
fn needs_context_gate(outputs: &Value, report: &mut Report) {
    const GATE: &str = "needs_context_consistency";
    let Some(outputs) = outputs.as_object() else {
        return;
    };
    let needs_context = outputs
        .get("needs_context")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let artifacts: Vec<&str> = outputs
        .iter()
        .filter(|(key, value)| !ENVELOPE_KEYS.contains(&key.as_str()) && !is_empty(value))
        .map(|(key, _)| key.as_str())
        .collect();

    if needs_context && !artifacts.is_empty() {
        report.fail(
            GATE,
            format!("needs_context=true and artifacts present: {}", artifacts.join(", ")),
            "outputs.needs_context is true but artifacts are present.".into(),
            "If required context is missing, return only needs_context, missing_fields, assumptions, telemetry_events.".into(),
        );
    } else {
        report.pass(GATE, "needs_context aligns with artifact presence");
    }
}

fn manifest_gate(gate: &QualityGate, outputs: &Value, report: &mut Report) {
    let path = &gate.path;
    let found = path.lookup(outputs).filter(|v| !v.is_null());

    // Ok(evidence) or Err((evidence, issue))
    let outcome = match (&gate.rule, found) {
        (_, None) => Err((format!("{path} missing"), format!("{path} is missing."))),
        (GateRule::Present, Some(_)) => Ok(format!("{path} present")),
        (GateRule::NonEmpty, Some(v)) if is_empty(v) => {
            Err((format!("{path} empty"), format!("{path} is empty.")))
        }
        (GateRule::NonEmpty, Some(_)) => Ok(format!("{path} non-empty")),
        (GateRule::MinItems { min_items }, Some(v)) => match v.as_array().map(Vec::len) {
            Some(n) if n >= *min_items => Ok(format!("count={n}")),
            Some(n) => Err((
                format!("count={n}"),
                format!("{path} must include at least {min_items} items."),
            )),
            None => Err((
                format!("{path} is not an array"),
                format!("{path} must be an array of at least {min_items} items."),
            )),
        },
    };

    match outcome {
        Ok(evidence) => report.pass(&gate.gate, evidence),
        Err((evidence, issue)) => {
            let fix = gate
                .fix
                .clone()
                .unwrap_or_else(|| format!("Provide {path} in outputs."));
            report.fail(&gate.gate, evidence, issue, fix);
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
