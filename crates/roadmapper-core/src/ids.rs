//! Opaque identifiers for roadmaps and timeline entries.
//!
//! Locally created ids are UUIDs, but ids assigned by a remote store are
//! accepted verbatim, so both types wrap a plain string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roadmap identifier, stable for the lifetime of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoadmapId(pub String);

impl RoadmapId {
    /// Generate a fresh, globally unique id
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoadmapId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoadmapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoadmapId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RoadmapId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Timeline entry identifier, unique within one document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
