pub mod call;
pub mod check;
pub mod list;
pub mod serve;

use packwarden_config::AppConfig;
use packwarden_hooks::default_hooks;
use packwarden_registry::RegistryHandle;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load the config file, then apply the `--packs-dir` override.
pub fn load_config(
    path: Option<&Path>,
    packs_dir: Option<PathBuf>,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config =
        AppConfig::load_with(path).map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(dir) = packs_dir {
        config.packs_dir = dir;
    }
    Ok(config)
}

/// Load the configured packs directory with the built-in hooks.
pub fn load_registry(config: &AppConfig) -> Result<Arc<RegistryHandle>, Box<dyn std::error::Error>> {
    let handle = RegistryHandle::load(&config.packs_dir, default_hooks()).map_err(|e| {
        format!(
            "Failed to load packs from {}: {e}",
            config.packs_dir.display()
        )
    })?;
    Ok(Arc::new(handle))
}
