//! `packwarden call` — Dispatch one operation and print its result.

use packwarden_config::AppConfig;
use packwarden_registry::DispatchEngine;
use serde_json::Value;
use std::path::PathBuf;

use super::load_registry;

/// Returns `true` only when the result status is `ok`.
pub async fn run(
    config: &AppConfig,
    name: &str,
    context: Option<String>,
    context_file: Option<PathBuf>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let context = read_context(context, context_file)?;
    let engine = DispatchEngine::new(load_registry(config)?);

    let result = engine.dispatch(name, context).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(result.is_ok())
}

fn read_context(
    inline: Option<String>,
    file: Option<PathBuf>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = match (inline, file) {
        (Some(json), _) => json,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?,
        (None, None) => return Ok(Value::Object(Default::default())),
    };
    let value = serde_json::from_str(&raw).map_err(|e| format!("Invalid context JSON: {e}"))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_context_is_empty_object() {
        assert_eq!(read_context(None, None).unwrap(), json!({}));
    }

    #[test]
    fn inline_context_is_parsed() {
        let ctx = read_context(Some(r#"{"product": {"name": "Acme"}}"#.into()), None).unwrap();
        assert_eq!(ctx["product"]["name"], "Acme");
    }

    #[test]
    fn context_file_is_read() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ctx.json");
        std::fs::write(&path, r#"{"ticket": {"subject": "Login fails"}}"#).unwrap();
        let ctx = read_context(None, Some(path)).unwrap();
        assert_eq!(ctx["ticket"]["subject"], "Login fails");
    }

    #[test]
    fn malformed_context_is_an_error() {
        let err = read_context(Some("{nope".into()), None).unwrap_err();
        assert!(err.to_string().starts_with("Invalid context JSON"));
    }
}
