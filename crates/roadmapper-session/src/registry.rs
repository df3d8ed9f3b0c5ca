//! The set of saved roadmaps and which one is active.

use roadmapper_core::{RoadmapDocument, RoadmapId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry must hold at least one roadmap")]
    Empty,
    #[error("roadmap {0} appears more than once")]
    DuplicateId(RoadmapId),
    #[error("cannot remove the only roadmap")]
    LastRoadmap,
    #[error("unknown roadmap {0}")]
    Unknown(RoadmapId),
}

/// Non-empty list of roadmaps with unique ids and one active member.
///
/// Serialised as `{ "currentId": ..., "roadmaps": [...] }`. Deserialising
/// enforces the same invariants; an unknown `currentId` selects the first
/// roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRegistry", into = "StoredRegistry")]
pub struct RoadmapRegistry {
    current_id: RoadmapId,
    roadmaps: Vec<RoadmapDocument>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRegistry {
    #[serde(default)]
    current_id: Option<RoadmapId>,
    roadmaps: Vec<RoadmapDocument>,
}

impl TryFrom<StoredRegistry> for RoadmapRegistry {
    type Error = RegistryError;

    fn try_from(stored: StoredRegistry) -> Result<Self, Self::Error> {
        Self::from_documents(stored.roadmaps, stored.current_id.as_ref())
    }
}

impl From<RoadmapRegistry> for StoredRegistry {
    fn from(registry: RoadmapRegistry) -> Self {
        Self {
            current_id: Some(registry.current_id),
            roadmaps: registry.roadmaps,
        }
    }
}

/// What [`RoadmapRegistry::remove`] did
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveOutcome {
    pub removed: RoadmapDocument,
    /// Set when the removed roadmap was active and another took its place
    pub new_current: Option<RoadmapId>,
}

impl RoadmapRegistry {
    /// A registry holding only `doc`, which is active
    pub fn single(doc: RoadmapDocument) -> Self {
        Self {
            current_id: doc.id.clone(),
            roadmaps: vec![doc],
        }
    }

    /// Build from a list, selecting `current` if present and the first otherwise
    pub fn from_documents(
        roadmaps: Vec<RoadmapDocument>,
        current: Option<&RoadmapId>,
    ) -> Result<Self, RegistryError> {
        let first = roadmaps.first().ok_or(RegistryError::Empty)?;
        for (index, doc) in roadmaps.iter().enumerate() {
            if roadmaps[..index].iter().any(|other| other.id == doc.id) {
                return Err(RegistryError::DuplicateId(doc.id.clone()));
            }
        }
        let current_id = current
            .filter(|id| roadmaps.iter().any(|doc| &doc.id == *id))
            .unwrap_or(&first.id)
            .clone();
        Ok(Self {
            current_id,
            roadmaps,
        })
    }

    /// Id of the active roadmap
    pub fn current_id(&self) -> &RoadmapId {
        &self.current_id
    }

    /// The active roadmap
    pub fn current(&self) -> &RoadmapDocument {
        &self.roadmaps[self.current_index()]
    }

    fn current_index(&self) -> usize {
        self.position(&self.current_id).unwrap_or(0)
    }

    fn position(&self, id: &RoadmapId) -> Option<usize> {
        self.roadmaps.iter().position(|doc| &doc.id == id)
    }

    /// Every roadmap, in display order
    pub fn roadmaps(&self) -> &[RoadmapDocument] {
        &self.roadmaps
    }

    /// Number of roadmaps
    pub fn len(&self) -> usize {
        self.roadmaps.len()
    }

    /// Never true for a registry built through this API
    pub fn is_empty(&self) -> bool {
        self.roadmaps.is_empty()
    }

    /// Look up a roadmap by id
    pub fn get(&self, id: &RoadmapId) -> Option<&RoadmapDocument> {
        self.position(id).map(|index| &self.roadmaps[index])
    }

    /// Whether a roadmap with `id` exists
    pub fn contains(&self, id: &RoadmapId) -> bool {
        self.position(id).is_some()
    }

    /// Make `id` the active roadmap
    pub fn select(&mut self, id: &RoadmapId) -> Result<&RoadmapDocument, RegistryError> {
        let index = self
            .position(id)
            .ok_or_else(|| RegistryError::Unknown(id.clone()))?;
        self.current_id = id.clone();
        Ok(&self.roadmaps[index])
    }

    /// Replace the member with the same id; returns false if there is none
    pub fn update(&mut self, doc: RoadmapDocument) -> bool {
        match self.position(&doc.id) {
            Some(index) => {
                self.roadmaps[index] = doc;
                true
            }
            None => false,
        }
    }

    /// Store the active document after an edit.
    ///
    /// A document whose id is not yet registered (a reset, or undoing one)
    /// takes the place of the current member and becomes current.
    pub fn sync_present(&mut self, doc: RoadmapDocument) {
        if self.contains(&doc.id) {
            self.update(doc);
            return;
        }
        let index = self.current_index();
        self.current_id = doc.id.clone();
        self.roadmaps[index] = doc;
    }

    /// Add (or replace) `doc` and make it current
    pub fn insert_and_select(&mut self, doc: RoadmapDocument) {
        self.current_id = doc.id.clone();
        if !self.update(doc.clone()) {
            self.roadmaps.push(doc);
        }
    }

    /// Remove a roadmap that is not the last one
    pub fn remove(&mut self, id: &RoadmapId) -> Result<RemoveOutcome, RegistryError> {
        let index = self
            .position(id)
            .ok_or_else(|| RegistryError::Unknown(id.clone()))?;
        if self.roadmaps.len() == 1 {
            return Err(RegistryError::LastRoadmap);
        }
        let removed = self.roadmaps.remove(index);
        let new_current = if removed.id == self.current_id {
            self.current_id = self.roadmaps[0].id.clone();
            Some(self.current_id.clone())
        } else {
            None
        };
        Ok(RemoveOutcome {
            removed,
            new_current,
        })
    }

    /// Consume the registry, yielding its roadmaps in order
    pub fn into_documents(self) -> Vec<RoadmapDocument> {
        self.roadmaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> RoadmapDocument {
        RoadmapDocument::empty(RoadmapId::from(id), id.to_uppercase(), 1)
    }

    fn registry(ids: &[&str]) -> RoadmapRegistry {
        RoadmapRegistry::from_documents(ids.iter().map(|id| doc(id)).collect(), None).unwrap()
    }

    #[test]
    fn rejects_empty_and_duplicate_lists() {
        assert_eq!(
            RoadmapRegistry::from_documents(Vec::new(), None),
            Err(RegistryError::Empty)
        );
        assert_eq!(
            RoadmapRegistry::from_documents(vec![doc("a"), doc("a")], None),
            Err(RegistryError::DuplicateId(RoadmapId::from("a")))
        );
    }

    #[test]
    fn unknown_current_falls_back_to_first() {
        let json = r#"{"currentId":"zzz","roadmaps":[{"id":"a","title":"A"},{"id":"b","title":"B"}]}"#;
        let registry: RoadmapRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(registry.current_id().as_str(), "a");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn serialises_with_current_id() {
        let registry = registry(&["a", "b"]);
        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json["currentId"], "a");
        assert_eq!(json["roadmaps"][1]["id"], "b");
        let back: RoadmapRegistry = serde_json::from_value(json).unwrap();
        assert_eq!(back, registry);
    }

    #[test]
    fn empty_stored_list_fails_to_deserialise() {
        let json = r#"{"currentId":"a","roadmaps":[]}"#;
        assert!(serde_json::from_str::<RoadmapRegistry>(json).is_err());
    }

    #[test]
    fn removing_current_selects_first_remaining() {
        let mut registry = registry(&["a", "b", "c"]);
        registry.select(&RoadmapId::from("b")).unwrap();
        let outcome = registry.remove(&RoadmapId::from("b")).unwrap();
        assert_eq!(outcome.new_current, Some(RoadmapId::from("a")));
        assert_eq!(registry.current().id.as_str(), "a");

        let outcome = registry.remove(&RoadmapId::from("c")).unwrap();
        assert_eq!(outcome.new_current, None);
        assert_eq!(
            registry.remove(&RoadmapId::from("a")),
            Err(RegistryError::LastRoadmap)
        );
    }

    #[test]
    fn sync_present_swaps_in_unregistered_documents() {
        let mut registry = registry(&["a", "b"]);
        registry.select(&RoadmapId::from("b")).unwrap();
        registry.sync_present(doc("fresh"));
        assert_eq!(registry.current_id().as_str(), "fresh");
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(&RoadmapId::from("b")));
        assert_eq!(registry.roadmaps()[1].id.as_str(), "fresh");
    }

    #[test]
    fn insert_and_select_appends() {
        let mut registry = registry(&["a"]);
        registry.insert_and_select(doc("b"));
        assert_eq!(registry.current_id().as_str(), "b");
        assert_eq!(registry.len(), 2);
    }
}
