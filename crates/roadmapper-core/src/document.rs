//! The roadmap document: an ordered list of timeline entries plus styling.
//!
//! Documents are plain values. Every edit produces a new document through
//! [`crate::reduce`]; nothing here mutates shared state.

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::ids::{EntryId, RoadmapId};
use crate::style::{
    CustomColors, Endpoints, EntryShape, FontFamily, FontSize, LineStyle, LineThickness,
    Orientation,
};

/// Title given to new and migrated documents
pub const DEFAULT_TITLE: &str = "My Roadmap";

/// Theme selected for new documents
pub const DEFAULT_THEME: &str = "ocean";

/// One point on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: EntryId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form date label ("Q3", "March 2025", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl TimelineEntry {
    /// Blank entry with a fresh id, overridden by `patch`
    pub fn new(patch: EntryPatch) -> Self {
        let mut entry = Self {
            id: EntryId::new(),
            title: String::new(),
            description: None,
            date: None,
        };
        patch.apply_to(&mut entry);
        entry
    }
}

/// Field-wise update for a [`TimelineEntry`]; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl EntryPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.date.is_none()
    }

    /// Shallow-merge the set fields into `entry`
    pub fn apply_to(&self, entry: &mut TimelineEntry) {
        if let Some(title) = &self.title {
            entry.title = title.clone();
        }
        if let Some(description) = &self.description {
            entry.description = Some(description.clone());
        }
        if let Some(date) = &self.date {
            entry.date = Some(date.clone());
        }
    }
}

/// Visual configuration of a roadmap
///
/// Missing fields fall back to their defaults when deserialising, so
/// documents written by older clients still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Styling {
    pub theme_id: String,
    pub orientation: Orientation,
    pub font_size: FontSize,
    pub entry_shape: EntryShape,
    pub font_family: FontFamily,
    pub line_style: LineStyle,
    pub line_thickness: LineThickness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_colors: Option<CustomColors>,
    pub endpoints: Endpoints,
}

impl Default for Styling {
    fn default() -> Self {
        Self {
            theme_id: DEFAULT_THEME.to_string(),
            orientation: Orientation::default(),
            font_size: FontSize::default(),
            entry_shape: EntryShape::default(),
            font_family: FontFamily::default(),
            line_style: LineStyle::default(),
            line_thickness: LineThickness::default(),
            custom_colors: None,
            endpoints: Endpoints::default(),
        }
    }
}

/// A complete roadmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapDocument {
    pub id: RoadmapId,
    pub title: String,
    #[serde(default)]
    pub entries: Vec<TimelineEntry>,
    #[serde(flatten)]
    pub style: Styling,
    /// Bumped on every edit; doubles as a dirty marker
    #[serde(default)]
    pub last_modified: Timestamp,
}

impl RoadmapDocument {
    /// Empty document with default styling
    pub fn empty(id: RoadmapId, title: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            title: title.into(),
            entries: Vec::new(),
            style: Styling::default(),
            last_modified: now,
        }
    }

    /// The starter document shown to new users
    pub fn new_default(now: Timestamp) -> Self {
        let mut doc = Self::empty(RoadmapId::new(), DEFAULT_TITLE, now);
        doc.entries = vec![
            TimelineEntry::new(
                EntryPatch::title("Project Kickoff")
                    .with_description("Initial planning and setup")
                    .with_date("January 2025"),
            ),
            TimelineEntry::new(
                EntryPatch::title("Development Phase")
                    .with_description("Core feature implementation")
                    .with_date("March 2025"),
            ),
            TimelineEntry::new(EntryPatch::title("Launch").with_date("June 2025")),
        ];
        doc
    }

    /// Copy of this document under a new id with " (Copy)" appended to the title
    pub fn duplicate(&self, now: Timestamp) -> Self {
        Self {
            id: RoadmapId::new(),
            title: format!("{} (Copy)", self.title),
            entries: self.entries.clone(),
            style: self.style.clone(),
            last_modified: now,
        }
    }

    pub fn entry(&self, id: &EntryId) -> Option<&TimelineEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    pub fn entry_ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_has_three_entries() {
        let doc = RoadmapDocument::new_default(10);
        assert_eq!(doc.title, "My Roadmap");
        assert_eq!(doc.entries.len(), 3);
        assert_eq!(doc.entries[2].title, "Launch");
        assert_eq!(doc.entries[2].description, None);
        assert_eq!(doc.style.theme_id, "ocean");
        assert_eq!(doc.last_modified, 10);
    }

    #[test]
    fn duplicate_gets_new_id_and_copy_suffix() {
        let doc = RoadmapDocument::new_default(1);
        let copy = doc.duplicate(2);
        assert_ne!(copy.id, doc.id);
        assert_eq!(copy.title, "My Roadmap (Copy)");
        assert_eq!(copy.entries, doc.entries);
    }

    #[test]
    fn styling_is_flattened_on_the_wire() {
        let doc = RoadmapDocument::empty(RoadmapId::from("r1"), "T", 5);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["themeId"], "ocean");
        assert_eq!(json["lineThickness"], "medium");
        assert_eq!(json["lastModified"], 5);
        assert!(json.get("customColors").is_none());
    }

    #[test]
    fn missing_styling_fields_take_defaults() {
        let json = r#"{"id":"r1","title":"Old","entries":[{"id":"e1","title":"A"}],"themeId":"forest"}"#;
        let doc: RoadmapDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.style.theme_id, "forest");
        assert_eq!(doc.style.font_family, FontFamily::System);
        assert_eq!(doc.entries[0].date, None);
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let mut entry = TimelineEntry::new(EntryPatch::title("A").with_date("May"));
        EntryPatch::default().with_description("details").apply_to(&mut entry);
        assert_eq!(entry.title, "A");
        assert_eq!(entry.date.as_deref(), Some("May"));
        assert_eq!(entry.description.as_deref(), Some("details"));
    }
}
