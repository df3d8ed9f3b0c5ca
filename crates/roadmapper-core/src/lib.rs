//! Core types for roadmapper: the roadmap document, its edit actions, and
//! the pure reducer that applies them.
//!
//! Nothing in this crate performs I/O. Persistence and synchronisation live in
//! `roadmapper-session` and `roadmapper-sync`.

pub mod action;
pub mod clock;
pub mod document;
pub mod fingerprint;
pub mod ids;
pub mod share;
pub mod style;

pub use action::{is_permutation_of, next_stamp, reduce, Action};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use document::{
    EntryPatch, RoadmapDocument, Styling, TimelineEntry, DEFAULT_THEME, DEFAULT_TITLE,
};
pub use fingerprint::Fingerprint;
pub use ids::{EntryId, RoadmapId};
pub use share::{decode_share_fragment, encode_share_fragment, SharedRoadmap, SHARED_TITLE};
pub use style::{
    CustomColors, EndpointStyle, Endpoints, EntryShape, FontFamily, FontSize, LineStyle,
    LineThickness, Orientation, UnknownStyle,
};
