//! Content fingerprints used to skip redundant saves.

use serde::Serialize;

use crate::document::{RoadmapDocument, Styling, TimelineEntry};
use crate::ids::RoadmapId;

/// Stable serialisation of every persisted field of a document.
///
/// `last_modified` is excluded: two documents with the same content but
/// different stamps share a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Persisted<'a> {
    id: &'a RoadmapId,
    title: &'a str,
    entries: &'a [TimelineEntry],
    #[serde(flatten)]
    style: &'a Styling,
}

impl Fingerprint {
    pub fn of(doc: &RoadmapDocument) -> Self {
        let persisted = Persisted {
            id: &doc.id,
            title: &doc.title,
            entries: &doc.entries,
            style: &doc.style,
        };
        // Struct fields serialise in declaration order, so the output is stable.
        let text = serde_json::to_string(&persisted).unwrap_or_else(|_| format!("{doc:?}"));
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
