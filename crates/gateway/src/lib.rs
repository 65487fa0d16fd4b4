//! HTTP API gateway for Packwarden.
//!
//! Exposes the registry over HTTP: a health check, discovery of operations
//! and packs, dispatch, and an explicit reload.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::{Router, extract::State, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use packwarden_config::AppConfig;
use packwarden_core::EventBus;
use packwarden_hooks::default_hooks;
use packwarden_registry::{DispatchEngine, RegistryHandle};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub registry: Arc<RegistryHandle>,
    pub engine: Arc<DispatchEngine>,
}

impl GatewayState {
    /// Wire a dispatch engine onto `registry`.
    pub fn new(config: AppConfig, registry: Arc<RegistryHandle>, events: Arc<EventBus>) -> Self {
        let engine = Arc::new(DispatchEngine::new(Arc::clone(&registry)).with_events(events));
        Self {
            config,
            registry,
            engine,
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.gateway.max_body_bytes;
    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Load the packs named by `config` and serve until shutdown.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let events = Arc::new(EventBus::default());
    let registry = Arc::new(RegistryHandle::load_with_events(
        &config.packs_dir,
        default_hooks(),
        Arc::clone(&events),
    )?);
    let current = registry.current();
    info!(
        packs_dir = %config.packs_dir.display(),
        operations = current.len(),
        rejected = current.report().len(),
        "Registry loaded"
    );

    let state = Arc::new(GatewayState::new(config, registry, events));
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    name: String,
    version: String,
    operations: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: state.config.server.name.clone(),
        version: state.config.server.version.clone(),
        operations: state.registry.current().len(),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::path::PathBuf;

    /// The packs bundled with the repository.
    pub fn bundled_packs() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../packs")
    }

    pub fn state_for(packs_dir: PathBuf) -> SharedState {
        let config = AppConfig {
            packs_dir: packs_dir.clone(),
            ..AppConfig::default()
        };
        let events = Arc::new(EventBus::default());
        let registry = Arc::new(
            RegistryHandle::load_with_events(packs_dir, default_hooks(), Arc::clone(&events))
                .unwrap(),
        );
        Arc::new(GatewayState::new(config, registry, events))
    }
}
