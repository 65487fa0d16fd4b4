//! Telemetry events embedded in hook output.

use packwarden_core::{PackDescriptor, PackEvent};
use serde_json::Value;
use tracing::warn;

/// Build an event for `pack`, checking it against the pack's events schema.
///
/// A non-conforming event is still returned; the mismatch is logged.
pub fn pack_event(
    pack: &PackDescriptor,
    event_type: &str,
    correlation_id: &str,
    details: Value,
) -> PackEvent {
    let event = PackEvent::new(
        event_type,
        pack.pack_id(),
        pack.version(),
        correlation_id,
        details,
    );

    if let Some(schema) = &pack.events_schema {
        match serde_json::to_value(&event) {
            Ok(value) => {
                let result = schema.validate(&value);
                if !result.ok {
                    for violation in &result.violations {
                        warn!(
                            pack_id = %pack.pack_id(),
                            event_type,
                            path = %violation.path,
                            "Telemetry event does not match events schema: {}",
                            violation.message
                        );
                    }
                }
            }
            Err(e) => warn!(pack_id = %pack.pack_id(), "Failed to serialize telemetry event: {e}"),
        }
    }

    event
}

/// Serialize events for inclusion in a hook's output.
pub fn to_values(events: &[PackEvent]) -> Vec<Value> {
    events
        .iter()
        .filter_map(|e| serde_json::to_value(e).ok())
        .collect()
}
