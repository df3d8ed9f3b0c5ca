//! Store adapter bound to one signed-in session.

use std::sync::Arc;

use roadmapper_core::{RoadmapDocument, RoadmapId};

use crate::auth::AuthToken;
use crate::error::StoreError;
use crate::store::{RemoteRoadmap, RoadmapPatch, RoadmapStore};

/// The remote store as seen by one signed-in user.
///
/// Results are converted to [`RoadmapDocument`]s so callers never handle
/// the wire representation.
#[derive(Clone)]
pub struct RemoteRoadmaps {
    store: Arc<dyn RoadmapStore>,
    token: AuthToken,
}

impl RemoteRoadmaps {
    pub fn new(store: Arc<dyn RoadmapStore>, token: AuthToken) -> Self {
        Self { store, token }
    }

    pub fn store(&self) -> &Arc<dyn RoadmapStore> {
        &self.store
    }

    pub async fn list(&self) -> Result<Vec<RoadmapDocument>, StoreError> {
        let roadmaps = self.store.list(&self.token).await?;
        Ok(roadmaps.iter().map(RemoteRoadmap::to_document).collect())
    }

    pub async fn create(&self, patch: RoadmapPatch) -> Result<RoadmapDocument, StoreError> {
        Ok(self.store.create(&self.token, patch).await?.to_document())
    }

    pub async fn get(&self, id: &RoadmapId) -> Result<RoadmapDocument, StoreError> {
        Ok(self.store.get(&self.token, id).await?.to_document())
    }

    pub async fn update(
        &self,
        id: &RoadmapId,
        patch: RoadmapPatch,
    ) -> Result<RoadmapDocument, StoreError> {
        Ok(self.store.update(&self.token, id, patch).await?.to_document())
    }

    pub async fn delete(&self, id: &RoadmapId) -> Result<(), StoreError> {
        self.store.delete(&self.token, id).await
    }

    pub async fn duplicate(&self, id: &RoadmapId) -> Result<RoadmapDocument, StoreError> {
        Ok(self.store.duplicate(&self.token, id).await?.to_document())
    }

    /// Returns the full remote record so callers can read the new visibility
    pub async fn set_visibility(
        &self,
        id: &RoadmapId,
        is_public: bool,
    ) -> Result<RemoteRoadmap, StoreError> {
        self.store.set_visibility(&self.token, id, is_public).await
    }

    pub async fn generate_share_token(&self, id: &RoadmapId) -> Result<String, StoreError> {
        self.store.issue_share_token(&self.token, id).await
    }

    pub async fn revoke_share_token(&self, id: &RoadmapId) -> Result<RemoteRoadmap, StoreError> {
        self.store.revoke_share_token(&self.token, id).await
    }
}
