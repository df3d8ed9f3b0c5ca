//! The remote document store contract and its wire types.

use async_trait::async_trait;
use roadmapper_core::{
    CustomColors, Endpoints, EntryShape, FontFamily, FontSize, LineStyle, LineThickness,
    Orientation, RoadmapDocument, RoadmapId, Styling, TimelineEntry, Timestamp,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::{AuthToken, UserId};
use crate::error::StoreError;

/// The caller's access level on a remote roadmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Owner,
    Edit,
    View,
}

impl Permission {
    pub fn can_edit(self) -> bool {
        matches!(self, Permission::Owner | Permission::Edit)
    }
}

/// A roadmap as returned by the store, with ownership and sharing metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRoadmap {
    pub id: RoadmapId,
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub entries: Vec<TimelineEntry>,
    #[serde(flatten)]
    pub style: Styling,
    pub is_public: bool,
    pub share_token: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub permission: Permission,
}

impl RemoteRoadmap {
    /// Local view of this roadmap; `updated_at` becomes `last_modified`
    pub fn to_document(&self) -> RoadmapDocument {
        RoadmapDocument {
            id: self.id.clone(),
            title: self.title.clone(),
            entries: self.entries.clone(),
            style: self.style.clone(),
            last_modified: self.updated_at,
        }
    }
}

/// Partial roadmap content for `create` and `update`; unset fields are left
/// to the store's defaults (on create) or untouched (on update)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<TimelineEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_shape: Option<EntryShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<FontFamily>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_style: Option<LineStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_thickness: Option<LineThickness>,
    /// `Some(None)` clears the palette; sent as an explicit `null`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub custom_colors: Option<Option<CustomColors>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Endpoints>,
}

impl RoadmapPatch {
    /// Every persisted field of `doc`
    pub fn from_document(doc: &RoadmapDocument) -> Self {
        Self {
            title: Some(doc.title.clone()),
            entries: Some(doc.entries.clone()),
            theme_id: Some(doc.style.theme_id.clone()),
            orientation: Some(doc.style.orientation),
            font_size: Some(doc.style.font_size),
            entry_shape: Some(doc.style.entry_shape),
            font_family: Some(doc.style.font_family),
            line_style: Some(doc.style.line_style),
            line_thickness: Some(doc.style.line_thickness),
            custom_colors: Some(doc.style.custom_colors.clone()),
            endpoints: Some(doc.style.endpoints.clone()),
        }
    }

    /// Overwrite the fields set in this patch
    pub fn apply(&self, title: &mut String, entries: &mut Vec<TimelineEntry>, style: &mut Styling) {
        if let Some(value) = &self.title {
            *title = value.clone();
        }
        if let Some(value) = &self.entries {
            *entries = value.clone();
        }
        if let Some(value) = &self.theme_id {
            style.theme_id = value.clone();
        }
        if let Some(value) = self.orientation {
            style.orientation = value;
        }
        if let Some(value) = self.font_size {
            style.font_size = value;
        }
        if let Some(value) = self.entry_shape {
            style.entry_shape = value;
        }
        if let Some(value) = self.font_family {
            style.font_family = value;
        }
        if let Some(value) = self.line_style {
            style.line_style = value;
        }
        if let Some(value) = self.line_thickness {
            style.line_thickness = value;
        }
        if let Some(value) = &self.custom_colors {
            style.custom_colors = value.clone();
        }
        if let Some(value) = &self.endpoints {
            style.endpoints = value.clone();
        }
    }
}

/// A field that is present, even as `null`, deserialises to `Some`
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Server-side roadmap persistence.
///
/// Authenticated calls take the caller's token; `get_public` and
/// `get_by_share_token` are open to anyone holding the id or token.
#[async_trait]
pub trait RoadmapStore: Send + Sync {
    /// Roadmaps owned by or shared with the caller, most recently updated first
    async fn list(&self, auth: &AuthToken) -> Result<Vec<RemoteRoadmap>, StoreError>;

    async fn create(
        &self,
        auth: &AuthToken,
        patch: RoadmapPatch,
    ) -> Result<RemoteRoadmap, StoreError>;

    async fn get(&self, auth: &AuthToken, id: &RoadmapId) -> Result<RemoteRoadmap, StoreError>;

    async fn get_public(&self, id: &RoadmapId) -> Result<RemoteRoadmap, StoreError>;

    async fn get_by_share_token(&self, token: &str) -> Result<RemoteRoadmap, StoreError>;

    async fn update(
        &self,
        auth: &AuthToken,
        id: &RoadmapId,
        patch: RoadmapPatch,
    ) -> Result<RemoteRoadmap, StoreError>;

    async fn delete(&self, auth: &AuthToken, id: &RoadmapId) -> Result<(), StoreError>;

    async fn duplicate(&self, auth: &AuthToken, id: &RoadmapId)
    -> Result<RemoteRoadmap, StoreError>;

    async fn set_visibility(
        &self,
        auth: &AuthToken,
        id: &RoadmapId,
        is_public: bool,
    ) -> Result<RemoteRoadmap, StoreError>;

    async fn issue_share_token(&self, auth: &AuthToken, id: &RoadmapId)
    -> Result<String, StoreError>;

    async fn revoke_share_token(
        &self,
        auth: &AuthToken,
        id: &RoadmapId,
    ) -> Result<RemoteRoadmap, StoreError>;
}
