//! The live registry, swappable on reload.

use packwarden_core::event::kind;
use packwarden_core::{EventBus, HookTable, LoadError, PackEvent};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::loader::load;
use crate::registry::Registry;

/// Holds the current [`Registry`].
///
/// Readers clone the `Arc` and drop the lock immediately, so an in-flight
/// call keeps the snapshot it started with. A reload builds the replacement
/// off-lock and swaps it in whole.
///
/// Every rejected pack is published as `pack_rejected`, and every
/// successful reload as `registry_reloaded`.
pub struct RegistryHandle {
    root: PathBuf,
    hooks: HookTable,
    current: RwLock<Arc<Registry>>,
    events: Arc<EventBus>,
}

impl RegistryHandle {
    /// Load `root` and build the initial registry.
    pub fn load(root: impl Into<PathBuf>, hooks: HookTable) -> Result<Self, LoadError> {
        Self::load_with_events(root, hooks, Arc::new(EventBus::default()))
    }

    /// Like [`RegistryHandle::load`], publishing load outcomes on `events`.
    pub fn load_with_events(
        root: impl Into<PathBuf>,
        hooks: HookTable,
        events: Arc<EventBus>,
    ) -> Result<Self, LoadError> {
        let root = root.into();
        let registry = Arc::new(Registry::build(load(&root)?, &hooks));
        let handle = Self {
            root,
            hooks,
            current: RwLock::new(Arc::clone(&registry)),
            events,
        };
        handle.publish_rejections(&registry, &Uuid::new_v4().to_string());
        Ok(handle)
    }

    pub fn current(&self) -> Arc<Registry> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Rescan the packs root and swap in the result.
    ///
    /// On a fatal load error the current registry stays in place.
    pub fn reload(&self) -> Result<Arc<Registry>, LoadError> {
        let next = Arc::new(Registry::build(load(&self.root)?, &self.hooks));
        {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::clone(&next);
        }
        info!(
            root = %self.root.display(),
            operations = next.len(),
            issues = next.report().len(),
            "Registry reloaded"
        );

        let correlation_id = Uuid::new_v4().to_string();
        self.publish_rejections(&next, &correlation_id);
        self.events.publish(PackEvent::new(
            kind::REGISTRY_RELOADED,
            "",
            "",
            correlation_id,
            json!({
                "root": self.root.display().to_string(),
                "packs": next.packs().count(),
                "operations": next.len(),
                "rejected": next.report().len(),
            }),
        ));
        Ok(next)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn publish_rejections(&self, registry: &Registry, correlation_id: &str) {
        for issue in registry.report() {
            self.events.publish(PackEvent::new(
                kind::PACK_REJECTED,
                "",
                "",
                correlation_id,
                json!({"pack_dir": issue.pack_dir, "reason": issue.reason}),
            ));
        }
    }
}
