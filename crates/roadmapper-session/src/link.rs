//! Links a session can be opened with.

use std::fmt;

use roadmapper_core::RoadmapId;

/// Whether the active document may be edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Edit,
    /// Read-only view of a shared or public roadmap
    View,
    /// Read-only, chrome-less rendering for embedding
    Embed,
}

impl ViewMode {
    pub fn is_read_only(self) -> bool {
        self != ViewMode::Edit
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Edit => "edit",
            ViewMode::View => "view",
            ViewMode::Embed => "embed",
        })
    }
}

/// A recognised location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLink {
    /// `/share/{token}`: private roadmap opened through its share token
    Share(String),
    /// `/public/{id}`: public roadmap
    Public(RoadmapId),
    /// `/embed/{id}`: public roadmap, embedded
    Embed(RoadmapId),
    /// `#share=...`: encoded roadmap to import
    Fragment(String),
}

impl InboundLink {
    /// Recognise a path (optionally with scheme, host, query and fragment).
    ///
    /// Path links take precedence over a `#share=` fragment.
    pub fn parse(location: &str) -> Option<Self> {
        let (rest, fragment) = match location.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (location, None),
        };
        let rest = rest.split_once('?').map_or(rest, |(path, _)| path);
        let path = match rest.split_once("://") {
            Some((_, after_scheme)) => after_scheme
                .find('/')
                .map_or("/", |slash| &after_scheme[slash..]),
            None => rest,
        };

        if let Some(link) = Self::parse_path(path) {
            return Some(link);
        }
        fragment
            .and_then(|fragment| fragment.strip_prefix("share="))
            .filter(|data| !data.is_empty())
            .map(|data| InboundLink::Fragment(data.to_string()))
    }

    fn parse_path(path: &str) -> Option<Self> {
        let (kind, value) = path.strip_prefix('/')?.split_once('/')?;
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return None;
        }
        match kind {
            "share" => Some(InboundLink::Share(value.to_string())),
            "public" => Some(InboundLink::Public(RoadmapId::from(value))),
            "embed" => Some(InboundLink::Embed(RoadmapId::from(value))),
            _ => None,
        }
    }

    /// Mode a session opened through this link starts in
    pub fn view_mode(&self) -> ViewMode {
        match self {
            InboundLink::Share(_) | InboundLink::Public(_) => ViewMode::View,
            InboundLink::Embed(_) => ViewMode::Embed,
            InboundLink::Fragment(_) => ViewMode::Edit,
        }
    }
}
