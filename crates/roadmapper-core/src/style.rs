//! Styling options for a roadmap.
//!
//! Every option serialises to the lowercase name used in stored JSON and
//! on the wire, and parses back from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A style option name that does not match any known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownStyle {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! style_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
        default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStyle;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownStyle {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

style_enum! {
    /// Direction the timeline runs in
    Orientation, "orientation" {
        Horizontal => "horizontal",
        Vertical => "vertical",
    }
    default Horizontal
}

style_enum! {
    FontSize, "font size" {
        Small => "small",
        Medium => "medium",
        Large => "large",
    }
    default Medium
}

style_enum! {
    /// Outline drawn around each timeline entry
    EntryShape, "entry shape" {
        Rounded => "rounded",
        Square => "square",
        Minimal => "minimal",
        Ghost => "ghost",
    }
    default Rounded
}

style_enum! {
    FontFamily, "font family" {
        System => "system",
        Serif => "serif",
        Mono => "mono",
        Inter => "inter",
        Playfair => "playfair",
        Roboto => "roboto",
        OpenSans => "opensans",
        Lato => "lato",
        Poppins => "poppins",
        Montserrat => "montserrat",
        Raleway => "raleway",
        Merriweather => "merriweather",
        SourceCode => "sourcecode",
        Nunito => "nunito",
        Oswald => "oswald",
    }
    default System
}

style_enum! {
    /// Stroke of the connecting timeline line
    LineStyle, "line style" {
        Solid => "solid",
        Dashed => "dashed",
        Dotted => "dotted",
    }
    default Solid
}

style_enum! {
    LineThickness, "line thickness" {
        Thin => "thin",
        Medium => "medium",
        Thick => "thick",
    }
    default Medium
}

style_enum! {
    /// Marker drawn at either end of the timeline
    EndpointStyle, "endpoint style" {
        None => "none",
        Dot => "dot",
        Arrow => "arrow",
        Diamond => "diamond",
        Square => "square",
    }
    default None
}

/// Colour palette overriding the selected theme
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub surface: String,
    pub text: String,
    pub text_muted: String,
    pub border: String,
}

/// Labels and decorations at the start and end of the timeline
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_style: Option<EndpointStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_style: Option<EndpointStyle>,
}

impl Endpoints {
    pub fn labelled(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for family in FontFamily::ALL {
            assert_eq!(family.as_str().parse::<FontFamily>(), Ok(*family));
        }
        assert_eq!("ghost".parse::<EntryShape>(), Ok(EntryShape::Ghost));
    }

    #[test]
    fn unknown_name_reports_kind() {
        let err = "diagonal".parse::<Orientation>().unwrap_err();
        assert_eq!(err.to_string(), "unknown orientation 'diagonal'");
    }

    #[test]
    fn serialises_to_wire_names() {
        assert_eq!(serde_json::to_string(&FontFamily::OpenSans).unwrap(), "\"opensans\"");
        let colors = CustomColors {
            text_muted: "#999".into(),
            ..CustomColors::default()
        };
        let json = serde_json::to_value(&colors).unwrap();
        assert_eq!(json["textMuted"], "#999");
    }

    #[test]
    fn endpoints_omit_unset_decorations() {
        let json = serde_json::to_value(Endpoints::labelled("Now", "Later")).unwrap();
        assert_eq!(json, serde_json::json!({ "start": "Now", "end": "Later" }));
    }
}
