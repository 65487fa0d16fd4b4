//! `packwarden list` — Show every registered operation.

use packwarden_config::AppConfig;
use serde_json::json;

use super::load_registry;

pub fn run(config: &AppConfig, as_json: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let registry = load_registry(config)?.current();
    let operations = registry.list();

    if as_json {
        let doc = json!({
            "server": {"name": config.server.name, "version": config.server.version},
            "operations": operations,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(true);
    }

    println!("📦 {} {}", config.server.name, config.server.version);
    println!("==================");
    if operations.is_empty() {
        println!("  No operations registered from {}", config.packs_dir.display());
        return Ok(true);
    }
    for op in &operations {
        let alias = op.tool_name.as_deref().unwrap_or("-");
        println!("  {:<44} {}", op.operation_id, alias);
        if !op.required_fields.is_empty() {
            let fields: Vec<String> = op.required_fields.iter().map(ToString::to_string).collect();
            println!("  {:<44} requires: {}", "", fields.join(", "));
        }
    }
    println!("\n  {} operation(s)", operations.len());

    Ok(true)
}
