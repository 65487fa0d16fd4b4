//! `packwarden check` — Load the packs directory and report problems.

use packwarden_config::AppConfig;

use super::load_registry;

pub fn run(config: &AppConfig) -> Result<bool, Box<dyn std::error::Error>> {
    let registry = load_registry(config)?.current();

    println!("🩺 Packwarden Check — {}", config.packs_dir.display());
    println!("========================================\n");

    for pack in registry.packs() {
        let methods: Vec<&str> = pack.methods.keys().map(|m| m.as_str()).collect();
        println!(
            "  ✅ {} {} ({}) [{}]",
            pack.pack_id(),
            pack.version(),
            pack.dir_name(),
            methods.join(", ")
        );
    }
    for issue in registry.report() {
        println!("  ❌ {}: {}", issue.pack_dir, issue.reason);
    }

    println!();
    let issues = registry.report().len();
    if issues == 0 {
        println!("  🎉 {} pack(s) loaded, no problems found.", registry.packs().count());
    } else {
        println!("  ⚠️  {issues} problem(s) found. See above for details.");
    }

    Ok(issues == 0)
}
