//! Pack events — what the registry and hooks report about their work.
//!
//! The same shape serves two purposes: hooks embed events in their output
//! (`telemetry_events`), and the dispatch engine publishes one per call on
//! the [`EventBus`] so other components can react without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event types emitted by the registry itself. Hooks may use their own.
pub mod kind {
    pub const PACK_LOADED: &str = "pack_loaded";
    pub const PACK_REJECTED: &str = "pack_rejected";
    pub const REGISTRY_RELOADED: &str = "registry_reloaded";
    pub const UNKNOWN_OPERATION: &str = "unknown_operation";
    pub const NEEDS_CONTEXT: &str = "needs_context";
    pub const CONTEXT_REJECTED: &str = "context_rejected";
    pub const OUTPUT_REJECTED: &str = "output_rejected";
    pub const HOOK_FAILED: &str = "hook_failed";
    pub const OPERATION_COMPLETED: &str = "operation_completed";
    pub const PLAN_GENERATED: &str = "plan_generated";
    pub const EXECUTION_COMPLETED: &str = "execution_completed";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackEvent {
    pub event_type: String,
    pub timestamp_iso: DateTime<Utc>,
    pub pack_id: String,
    pub version: String,
    pub correlation_id: String,
    #[serde(default)]
    pub details: Value,
}

impl PackEvent {
    pub fn new(
        event_type: impl Into<String>,
        pack_id: impl Into<String>,
        version: impl Into<String>,
        correlation_id: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp_iso: Utc::now(),
            pack_id: pack_id.into(),
            version: version.into(),
            correlation_id: correlation_id.into(),
            details,
        }
    }
}

/// A broadcast-based event bus for pack events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<PackEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: PackEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PackEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
