//! Self-contained share links carried in a URL fragment (`#share=<data>`).
//!
//! The payload is compact JSON with short keys, compressed with lz-string's
//! URI-safe alphabet so links from the web editor import unchanged. Ids and
//! timestamps are not carried; the importer assigns fresh ones.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Timestamp;
use crate::document::{EntryPatch, RoadmapDocument, Styling, TimelineEntry};
use crate::ids::RoadmapId;
use crate::style::{EntryShape, FontSize, Orientation};

/// Title used when a shared payload has none
pub const SHARED_TITLE: &str = "Shared Roadmap";

#[derive(Serialize, Deserialize)]
struct CompactRoadmap {
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(rename = "e", default)]
    entries: Vec<CompactEntry>,
    #[serde(rename = "th", default, skip_serializing_if = "Option::is_none")]
    theme_id: Option<String>,
    #[serde(rename = "o", default, skip_serializing_if = "Option::is_none")]
    orientation: Option<Orientation>,
    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    font_size: Option<FontSize>,
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    entry_shape: Option<EntryShape>,
}

#[derive(Serialize, Deserialize)]
struct CompactEntry {
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "dt", default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

/// Roadmap content decoded from a share fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedRoadmap {
    pub title: String,
    pub entries: Vec<TimelineEntry>,
    pub theme_id: String,
    pub orientation: Orientation,
    pub font_size: FontSize,
    pub entry_shape: EntryShape,
}

impl SharedRoadmap {
    pub fn styling(&self) -> Styling {
        Styling {
            theme_id: self.theme_id.clone(),
            orientation: self.orientation,
            font_size: self.font_size,
            entry_shape: self.entry_shape,
            ..Styling::default()
        }
    }

    /// Materialise as a local document under `id`
    pub fn into_document(self, id: RoadmapId, now: Timestamp) -> RoadmapDocument {
        let style = self.styling();
        RoadmapDocument {
            id,
            title: self.title,
            entries: self.entries,
            style,
            last_modified: now,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Encode the shareable subset of `doc`
pub fn encode_share_fragment(doc: &RoadmapDocument) -> String {
    let compact = CompactRoadmap {
        title: Some(doc.title.clone()),
        entries: doc
            .entries
            .iter()
            .map(|entry| CompactEntry {
                title: Some(entry.title.clone()),
                description: non_empty(&entry.description),
                date: non_empty(&entry.date),
            })
            .collect(),
        theme_id: Some(doc.style.theme_id.clone()),
        orientation: Some(doc.style.orientation),
        font_size: Some(doc.style.font_size),
        entry_shape: Some(doc.style.entry_shape),
    };
    let json = serde_json::to_string(&compact).unwrap_or_default();
    lz_str::compress_to_encoded_uri_component(json.as_str())
}

/// Decode a fragment payload; malformed input yields `None`
pub fn decode_share_fragment(data: &str) -> Option<SharedRoadmap> {
    let Some(wide) = lz_str::decompress_from_encoded_uri_component(data.trim()) else {
        warn!("share fragment is not lz-string data");
        return None;
    };
    let json = match String::from_utf16(&wide) {
        Ok(json) if !json.is_empty() => json,
        Ok(_) => {
            warn!("share fragment is empty");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "share fragment is not valid text");
            return None;
        }
    };
    let compact: CompactRoadmap = match serde_json::from_str(&json) {
        Ok(compact) => compact,
        Err(e) => {
            warn!(error = %e, "share fragment is not a roadmap");
            return None;
        }
    };

    let defaults = Styling::default();
    Some(SharedRoadmap {
        title: compact
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| SHARED_TITLE.to_string()),
        entries: compact
            .entries
            .into_iter()
            .map(|entry| {
                TimelineEntry::new(EntryPatch {
                    title: Some(entry.title.unwrap_or_default()),
                    description: entry.description,
                    date: entry.date,
                })
            })
            .collect(),
        theme_id: compact.theme_id.unwrap_or(defaults.theme_id),
        orientation: compact.orientation.unwrap_or_default(),
        font_size: compact.font_size.unwrap_or_default(),
        entry_shape: compact.entry_shape.unwrap_or_default(),
    })
}
