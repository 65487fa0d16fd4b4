//! `packwarden serve` — Start the HTTP API server.

use packwarden_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    port_override: Option<u16>,
) -> Result<bool, Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    eprintln!("📦 Packwarden Gateway");
    eprintln!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    eprintln!("   Packs:     {}", config.packs_dir.display());

    packwarden_gateway::start(config).await?;

    Ok(true)
}
