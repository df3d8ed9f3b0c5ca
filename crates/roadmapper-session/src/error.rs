use roadmapper_core::RoadmapId;
use roadmapper_sync::StoreError;
use thiserror::Error;

use crate::link::ViewMode;
use crate::registry::RegistryError;

/// Why a workspace operation was rejected
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("roadmap is read-only in {0} mode")]
    ReadOnly(ViewMode),
    #[error("unknown roadmap {0}")]
    UnknownRoadmap(RoadmapId),
    #[error("sign in required")]
    SignInRequired,
    #[error("no roadmap could be copied to your account")]
    MigrationFailed,
    #[error("share link could not be decoded")]
    InvalidShareLink,
}
