//! Edit actions and the pure reducer that applies them to a document.

use std::collections::HashSet;

use tracing::warn;

use crate::clock::Timestamp;
use crate::document::{EntryPatch, RoadmapDocument, TimelineEntry};
use crate::ids::EntryId;
use crate::style::{
    CustomColors, Endpoints, EntryShape, FontFamily, FontSize, LineStyle, LineThickness,
    Orientation,
};

/// Everything a user can do to the active document
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Append an entry with a fresh id, blank fields overridden by the patch
    AddEntry(EntryPatch),
    DeleteEntry(EntryId),
    UpdateEntry { id: EntryId, patch: EntryPatch },
    /// Replace the entry list wholesale; the caller guarantees a permutation
    ReorderEntries(Vec<TimelineEntry>),
    SetTitle(String),
    SetTheme(String),
    SetOrientation(Orientation),
    SetFontSize(FontSize),
    SetEntryShape(EntryShape),
    SetEndpoints(Endpoints),
    SetFontFamily(FontFamily),
    SetLineStyle(LineStyle),
    SetLineThickness(LineThickness),
    SetCustomColors(Option<CustomColors>),
    /// Replace with a fresh starter document (new id)
    Reset,
    /// Replace wholesale with an authoritative snapshot; not undoable
    LoadState(RoadmapDocument),
    Undo,
    Redo,
}

impl Action {
    /// Actions handled by the history itself rather than the reducer
    pub fn is_history_control(&self) -> bool {
        matches!(self, Action::Undo | Action::Redo | Action::LoadState(_))
    }
}

/// Stamp for an edit made at `now` on a document last stamped `previous`.
///
/// Always strictly greater than `previous`, even if the clock did not move.
pub fn next_stamp(previous: Timestamp, now: Timestamp) -> Timestamp {
    now.max(previous.saturating_add(1))
}

/// True when `candidate` holds exactly the ids of `current`, in any order
pub fn is_permutation_of(candidate: &[TimelineEntry], current: &[TimelineEntry]) -> bool {
    if candidate.len() != current.len() {
        return false;
    }
    let expected: HashSet<&EntryId> = current.iter().map(|entry| &entry.id).collect();
    let mut seen = HashSet::with_capacity(candidate.len());
    candidate
        .iter()
        .all(|entry| expected.contains(&entry.id) && seen.insert(&entry.id))
}

/// Apply `action` to `doc`.
///
/// Returns `None` when the action leaves the document unchanged (deleting or
/// updating a missing entry, setting a field to its current value, an empty
/// reorder, `Undo`/`Redo`). Any other result carries a fresh `last_modified`,
/// except `LoadState`, whose snapshot keeps its own stamp.
pub fn reduce(doc: &RoadmapDocument, action: Action, now: Timestamp) -> Option<RoadmapDocument> {
    let mut next = match action {
        Action::AddEntry(patch) => {
            let mut next = doc.clone();
            next.entries.push(TimelineEntry::new(patch));
            next
        }
        Action::DeleteEntry(id) => {
            doc.entry(&id)?;
            let mut next = doc.clone();
            next.entries.retain(|entry| entry.id != id);
            next
        }
        Action::UpdateEntry { id, patch } => {
            let index = doc.entries.iter().position(|entry| entry.id == id)?;
            let mut entry = doc.entries[index].clone();
            patch.apply_to(&mut entry);
            if entry == doc.entries[index] {
                return None;
            }
            let mut next = doc.clone();
            next.entries[index] = entry;
            next
        }
        Action::ReorderEntries(entries) => {
            if entries.is_empty() || entries == doc.entries {
                return None;
            }
            if !is_permutation_of(&entries, &doc.entries) {
                warn!(
                    roadmap_id = %doc.id,
                    expected = doc.entries.len(),
                    got = entries.len(),
                    "reorder payload is not a permutation of the current entries"
                );
            }
            let mut next = doc.clone();
            next.entries = entries;
            next
        }
        Action::SetTitle(title) => replace(doc, title, |d| &mut d.title)?,
        Action::SetTheme(theme_id) => replace(doc, theme_id, |d| &mut d.style.theme_id)?,
        Action::SetOrientation(value) => replace(doc, value, |d| &mut d.style.orientation)?,
        Action::SetFontSize(value) => replace(doc, value, |d| &mut d.style.font_size)?,
        Action::SetEntryShape(value) => replace(doc, value, |d| &mut d.style.entry_shape)?,
        Action::SetEndpoints(value) => replace(doc, value, |d| &mut d.style.endpoints)?,
        Action::SetFontFamily(value) => replace(doc, value, |d| &mut d.style.font_family)?,
        Action::SetLineStyle(value) => replace(doc, value, |d| &mut d.style.line_style)?,
        Action::SetLineThickness(value) => {
            replace(doc, value, |d| &mut d.style.line_thickness)?
        }
        Action::SetCustomColors(value) => replace(doc, value, |d| &mut d.style.custom_colors)?,
        Action::Reset => {
            return Some(RoadmapDocument::new_default(next_stamp(doc.last_modified, now)));
        }
        Action::LoadState(snapshot) => return Some(snapshot),
        Action::Undo | Action::Redo => return None,
    };
    next.last_modified = next_stamp(doc.last_modified, now);
    Some(next)
}

fn replace<T, F>(doc: &RoadmapDocument, value: T, field: F) -> Option<RoadmapDocument>
where
    T: PartialEq,
    F: FnOnce(&mut RoadmapDocument) -> &mut T,
{
    let mut next = doc.clone();
    let slot = field(&mut next);
    if *slot == value {
        return None;
    }
    *slot = value;
    Some(next)
}
