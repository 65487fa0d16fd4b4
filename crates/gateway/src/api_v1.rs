//! HTTP API v1 — discovery and dispatch over the pack registry.
//!
//! Endpoints:
//!
//! - `GET  /v1/operations`         — List every operation
//! - `GET  /v1/operations/{name}`  — Describe one operation (id or tool name)
//! - `POST /v1/operations/{name}`  — Dispatch; the JSON body is the context
//! - `GET  /v1/packs`              — Loaded packs plus the load report
//! - `POST /v1/reload`             — Rescan the packs root

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use packwarden_core::{DispatchResult, PackSummary};
use packwarden_registry::{LoadIssue, OperationInfo};

use crate::SharedState;

/// Build the v1 API router.
pub fn v1_router() -> Router<SharedState> {
    Router::new()
        .route("/operations", get(list_operations_handler))
        .route(
            "/operations/{name}",
            get(get_operation_handler).post(dispatch_handler),
        )
        .route("/packs", get(list_packs_handler))
        .route("/reload", post(reload_handler))
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct OperationListResponse {
    pub server: ServerInfo,
    pub operations: Vec<OperationInfo>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct PackListResponse {
    pub packs: Vec<PackSummary>,
    pub report: Vec<LoadIssue>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub packs: usize,
    pub operations: usize,
    pub report: Vec<LoadIssue>,
}

/// HTTP status for a dispatch outcome.
pub fn status_for(result: &DispatchResult) -> StatusCode {
    match result {
        DispatchResult::Ok { .. } => StatusCode::OK,
        DispatchResult::Unknown { .. } => StatusCode::NOT_FOUND,
        DispatchResult::NeedsContext { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DispatchResult::InvalidContext { .. } => StatusCode::BAD_REQUEST,
        DispatchResult::InvalidOutput { .. } => StatusCode::BAD_GATEWAY,
        DispatchResult::HookFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn list_operations_handler(State(state): State<SharedState>) -> Json<OperationListResponse> {
    let operations = state.registry.current().list();
    let count = operations.len();
    Json(OperationListResponse {
        server: ServerInfo {
            name: state.config.server.name.clone(),
            version: state.config.server.version.clone(),
        },
        operations,
        count,
    })
}

async fn get_operation_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<OperationInfo>, ApiError> {
    state
        .registry
        .current()
        .resolve(&name)
        .map(|entry| Json(entry.info()))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown operation '{name}'")))
}

/// An empty body dispatches with `{}`.
async fn dispatch_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<DispatchResult>), ApiError> {
    let context: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, format!("invalid JSON body: {e}"))
        })?
    };

    let result = state.engine.dispatch(&name, context).await;
    info!(operation = %name, status = result.status(), "Dispatched");
    Ok((status_for(&result), Json(result)))
}

async fn list_packs_handler(State(state): State<SharedState>) -> Json<PackListResponse> {
    let registry = state.registry.current();
    Json(PackListResponse {
        packs: registry.packs().map(|p| p.summary()).collect(),
        report: registry.report().to_vec(),
    })
}

async fn reload_handler(
    State(state): State<SharedState>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let handle = state.registry.clone();
    let reloaded = tokio::task::spawn_blocking(move || handle.reload())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("reload task failed: {e}")))?;

    match reloaded {
        Ok(registry) => Ok(Json(ReloadResponse {
            packs: registry.packs().count(),
            operations: registry.len(),
            report: registry.report().to_vec(),
        })),
        Err(e) => {
            warn!(error = %e, "Reload failed; keeping current registry");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
