//! Local persistence of the roadmap registry.
//!
//! The registry lives under [`STORAGE_KEY`]. Older clients stored a single
//! bare document under [`LEGACY_STORAGE_KEY`]; it is read once as a
//! one-roadmap registry and rewritten in the current format on next save.

use std::sync::Arc;

use roadmapper_core::{Clock, RoadmapDocument, RoadmapId, Styling, TimelineEntry, DEFAULT_TITLE};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::kv::KeyValueStore;
use crate::registry::RoadmapRegistry;

pub const STORAGE_KEY: &str = "roadmapper-data-v2";
pub const LEGACY_STORAGE_KEY: &str = "roadmapper-data";

/// A single document as written by the first client version; any stored
/// title is ignored
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDocument {
    entries: Vec<TimelineEntry>,
    #[serde(flatten)]
    style: Styling,
}

#[derive(Clone)]
pub struct LocalStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl LocalStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Load the saved registry.
    ///
    /// Tries the current key, then the legacy key, then falls back to a
    /// registry holding one fresh starter document. Never fails.
    pub fn load(&self) -> RoadmapRegistry {
        if let Some(registry) = self.load_current() {
            return registry;
        }
        if let Some(registry) = self.load_legacy() {
            info!("migrated legacy single-roadmap storage");
            return registry;
        }
        debug!("no saved roadmaps, starting fresh");
        RoadmapRegistry::single(RoadmapDocument::new_default(self.clock.now()))
    }

    fn load_current(&self) -> Option<RoadmapRegistry> {
        let raw = self.read(STORAGE_KEY)?;
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!(key = STORAGE_KEY, error = %e, "ignoring unreadable registry"))
            .ok()
    }

    fn load_legacy(&self) -> Option<RoadmapRegistry> {
        let raw = self.read(LEGACY_STORAGE_KEY)?;
        let legacy: LegacyDocument = serde_json::from_str(&raw)
            .inspect_err(|e| {
                warn!(key = LEGACY_STORAGE_KEY, error = %e, "ignoring unreadable legacy roadmap")
            })
            .ok()?;
        let doc = RoadmapDocument {
            id: RoadmapId::new(),
            title: DEFAULT_TITLE.to_string(),
            entries: legacy.entries,
            style: legacy.style,
            last_modified: self.clock.now(),
        };
        Some(RoadmapRegistry::single(doc))
    }

    fn read(&self, key: &str) -> Option<String> {
        self.kv
            .get(key)
            .inspect_err(|e| warn!(key, error = %e, "failed to read local storage"))
            .ok()
            .flatten()
    }

    /// Persist the registry; failures are logged and otherwise ignored
    pub fn save(&self, registry: &RoadmapRegistry) {
        let result = serde_json::to_string(registry)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.kv.set(STORAGE_KEY, &json));
        match result {
            Ok(()) => debug!(roadmaps = registry.len(), "saved roadmaps locally"),
            Err(e) => warn!(error = %e, "failed to save roadmaps locally"),
        }
    }

    /// Remove both current and legacy keys
    pub fn clear(&self) {
        for key in [STORAGE_KEY, LEGACY_STORAGE_KEY] {
            if let Err(e) = self.kv.remove(key) {
                warn!(key, error = %e, "failed to clear local storage");
            }
        }
    }

    /// True if either key currently holds data
    pub fn has_saved_data(&self) -> bool {
        [STORAGE_KEY, LEGACY_STORAGE_KEY]
            .into_iter()
            .any(|key| self.read(key).is_some())
    }
}
