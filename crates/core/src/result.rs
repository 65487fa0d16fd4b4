//! The outcome of one dispatched call.

use packwarden_schema::{FieldPath, Violation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a caller gets back from the dispatch engine.
///
/// Each variant is terminal. `NeedsContext` means "send more data",
/// `InvalidContext` means "the data you sent is malformed", and
/// `InvalidOutput`/`HookFailed` mean the pack itself is broken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResult {
    Unknown { operation_id: String },
    NeedsContext { missing_fields: Vec<FieldPath> },
    InvalidContext { violations: Vec<Violation> },
    Ok { output: Value },
    InvalidOutput { violations: Vec<Violation> },
    HookFailed { reason: String },
}

impl DispatchResult {
    /// The `status` tag as serialized.
    pub fn status(&self) -> &'static str {
        match self {
            DispatchResult::Unknown { .. } => "unknown",
            DispatchResult::NeedsContext { .. } => "needs_context",
            DispatchResult::InvalidContext { .. } => "invalid_context",
            DispatchResult::Ok { .. } => "ok",
            DispatchResult::InvalidOutput { .. } => "invalid_output",
            DispatchResult::HookFailed { .. } => "hook_failed",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, DispatchResult::Ok { .. })
    }

    pub fn output(&self) -> Option<&Value> {
        match self {
            DispatchResult::Ok { output } => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_status_tag() {
        let result = DispatchResult::NeedsContext {
            missing_fields: vec![FieldPath::parse("a.b").unwrap(), FieldPath::parse("c").unwrap()],
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "needs_context", "missing_fields": ["a.b", "c"]})
        );
        assert_eq!(result.status(), "needs_context");
    }

    #[test]
    fn status_matches_serde_tag() {
        let results = [
            DispatchResult::Unknown { operation_id: "pack.x.plan".into() },
            DispatchResult::InvalidContext { violations: vec![] },
            DispatchResult::Ok { output: json!({}) },
            DispatchResult::InvalidOutput { violations: vec![] },
            DispatchResult::HookFailed { reason: "boom".into() },
        ];
        for result in results {
            let value = serde_json::to_value(&result).unwrap();
            assert_eq!(value["status"], result.status());
        }
    }

    #[test]
    fn output_only_on_ok() {
        assert_eq!(
            DispatchResult::Ok { output: json!(1) }.output(),
            Some(&json!(1))
        );
        assert!(DispatchResult::HookFailed { reason: "x".into() }.output().is_none());
    }
}
