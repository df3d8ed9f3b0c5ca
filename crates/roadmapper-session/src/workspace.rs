//! The editing workspace: active document, its history, and the registry.

use std::sync::Arc;

use roadmapper_core::{
    encode_share_fragment, next_stamp, Action, Clock, RoadmapDocument, RoadmapId, SharedRoadmap,
    Timestamp,
};
use roadmapper_sync::{
    DebouncedSaver, RemoteRoadmap, RemoteRoadmaps, RoadmapPatch, RoadmapStore, Session,
};
use tracing::{debug, info};

use crate::config::WorkspaceConfig;
use crate::controller::SessionMode;
use crate::error::WorkspaceError;
use crate::history::History;
use crate::kv::KeyValueStore;
use crate::link::ViewMode;
use crate::local::LocalStore;
use crate::registry::RoadmapRegistry;

/// External capabilities a workspace runs against
#[derive(Clone)]
pub struct Environment {
    pub kv: Arc<dyn KeyValueStore>,
    pub store: Arc<dyn RoadmapStore>,
    pub clock: Arc<dyn Clock>,
}

/// Where edits to the active document are persisted
pub(crate) enum Authority {
    Local,
    Remote(DebouncedSaver),
}

/// One editing session.
///
/// Signed out, every change to the registry is written to local storage.
/// Signed in, the registry mirrors the remote store and edits to the active
/// document are saved through a [`DebouncedSaver`].
pub struct Workspace {
    pub(crate) env: Environment,
    pub(crate) config: WorkspaceConfig,
    pub(crate) local: LocalStore,
    pub(crate) history: History,
    pub(crate) registry: RoadmapRegistry,
    pub(crate) authority: Authority,
    pub(crate) phase: SessionMode,
    /// Last session reported by the auth layer
    pub(crate) session: Option<Session>,
    pub(crate) view_mode: ViewMode,
}

impl Workspace {
    /// Open a signed-out workspace over the locally saved roadmaps
    pub fn new(env: Environment, config: WorkspaceConfig) -> Self {
        let local = LocalStore::new(env.kv.clone(), env.clock.clone());
        let registry = local.load();
        let history = History::new(registry.current().clone(), config.history_cap);
        Self {
            env,
            config,
            local,
            history,
            registry,
            authority: Authority::Local,
            phase: SessionMode::Anonymous,
            session: None,
            view_mode: ViewMode::Edit,
        }
    }

    /// The active document as currently edited
    pub fn present(&self) -> &RoadmapDocument {
        self.history.present()
    }

    /// Id of the active document
    pub fn current_id(&self) -> &RoadmapId {
        &self.history.present().id
    }

    /// The open roadmaps
    pub fn registry(&self) -> &RoadmapRegistry {
        &self.registry
    }

    /// Every open roadmap, in display order
    pub fn roadmaps(&self) -> &[RoadmapDocument] {
        self.registry.roadmaps()
    }

    /// Undo history of the active document
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Settings this workspace was opened with
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Whether undo is available; always false in view and embed mode
    pub fn can_undo(&self) -> bool {
        !self.view_mode.is_read_only() && self.history.can_undo()
    }

    /// Whether redo is available; always false in view and embed mode
    pub fn can_redo(&self) -> bool {
        !self.view_mode.is_read_only() && self.history.can_redo()
    }

    /// Whether the workspace is editing or showing a shared roadmap
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Progress of the current sign-in
    pub fn session_mode(&self) -> SessionMode {
        self.phase
    }

    /// Last session reported by the auth layer, if any
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// True once edits are saved to the remote store
    pub fn is_authenticated(&self) -> bool {
        matches!(self.authority, Authority::Remote(_))
    }

    /// True while a remote save request is outstanding
    pub fn is_saving(&self) -> bool {
        match &self.authority {
            Authority::Remote(saver) => saver.is_saving(),
            Authority::Local => false,
        }
    }

    /// True while an edit is waiting for the debounce window to pass
    pub fn has_pending_save(&self) -> bool {
        match &self.authority {
            Authority::Remote(saver) => saver.has_pending(),
            Authority::Local => false,
        }
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.env.clock.now()
    }

    fn ensure_editable(&self) -> Result<(), WorkspaceError> {
        if self.view_mode.is_read_only() {
            return Err(WorkspaceError::ReadOnly(self.view_mode));
        }
        Ok(())
    }

    fn remote(&self) -> Result<&RemoteRoadmaps, WorkspaceError> {
        match &self.authority {
            Authority::Remote(saver) => Ok(saver.remote()),
            Authority::Local => Err(WorkspaceError::SignInRequired),
        }
    }

    /// Apply an edit to the active document.
    ///
    /// Returns whether the document changed. Rejected in view and embed mode.
    pub fn dispatch(&mut self, action: Action) -> Result<bool, WorkspaceError> {
        self.ensure_editable()?;
        let now = self.now();
        let changed = match action {
            // The store only knows the current id, so a signed-in reset keeps it
            Action::Reset if self.is_authenticated() => {
                let present = self.history.present();
                let mut fresh = RoadmapDocument::new_default(now);
                fresh.id = present.id.clone();
                fresh.last_modified = next_stamp(present.last_modified, now);
                self.history.commit(fresh)
            }
            action => self.history.dispatch(action, now),
        };
        if changed {
            self.persist_present();
        }
        Ok(changed)
    }

    /// Step back one edit of the active document
    pub fn undo(&mut self) -> Result<bool, WorkspaceError> {
        self.dispatch(Action::Undo)
    }

    /// Re-apply the last undone edit
    pub fn redo(&mut self) -> Result<bool, WorkspaceError> {
        self.dispatch(Action::Redo)
    }

    fn persist_present(&mut self) {
        self.registry.sync_present(self.history.present().clone());
        match &mut self.authority {
            Authority::Local => self.local.save(&self.registry),
            Authority::Remote(saver) => saver.observe(self.history.present()),
        }
    }

    /// Show a registry member that may differ from what the store last saw
    fn show_existing(&mut self, doc: RoadmapDocument) {
        self.history.load(doc);
        match &mut self.authority {
            Authority::Local => self.local.save(&self.registry),
            Authority::Remote(saver) => {
                saver.reset_fingerprint();
                saver.observe(self.history.present());
            }
        }
    }

    /// Show a document the store has just returned
    fn show_created(&mut self, doc: RoadmapDocument) {
        self.registry.insert_and_select(doc.clone());
        self.history.load(doc);
        match &mut self.authority {
            Authority::Local => self.local.save(&self.registry),
            Authority::Remote(saver) => saver.mark_saved(self.history.present()),
        }
    }

    /// Make another registry member the active document
    pub fn switch_roadmap(&mut self, id: &RoadmapId) -> Result<(), WorkspaceError> {
        self.ensure_editable()?;
        if !self.registry.contains(id) {
            return Err(WorkspaceError::UnknownRoadmap(id.clone()));
        }
        if self.current_id() == id {
            return Ok(());
        }
        if let Authority::Remote(saver) = &mut self.authority {
            saver.flush();
        }
        let doc = self.registry.select(id)?.clone();
        debug!(roadmap_id = %id, "switched roadmap");
        self.show_existing(doc);
        Ok(())
    }

    /// Add a fresh roadmap and make it active
    pub async fn create_new_roadmap(&mut self) -> Result<RoadmapId, WorkspaceError> {
        self.ensure_editable()?;
        let doc = match &mut self.authority {
            Authority::Local => RoadmapDocument::new_default(self.env.clock.now()),
            Authority::Remote(saver) => {
                saver.flush_and_wait().await;
                saver.remote().create(RoadmapPatch::default()).await?
            }
        };
        let id = doc.id.clone();
        info!(roadmap_id = %id, "created roadmap");
        self.show_created(doc);
        Ok(id)
    }

    /// Copy the active roadmap and make the copy active
    pub async fn duplicate_roadmap(&mut self) -> Result<RoadmapId, WorkspaceError> {
        self.ensure_editable()?;
        let source = self.current_id().clone();
        let doc = match &mut self.authority {
            Authority::Local => self.history.present().duplicate(self.env.clock.now()),
            Authority::Remote(saver) => {
                // The copy is made server-side from whatever it has saved
                saver.flush_and_wait().await;
                saver.remote().duplicate(&source).await?
            }
        };
        let id = doc.id.clone();
        info!(source = %source, roadmap_id = %id, "duplicated roadmap");
        self.show_created(doc);
        Ok(id)
    }

    /// Remove a roadmap.
    ///
    /// Removing the only roadmap replaces it with a fresh one. Removing the
    /// active roadmap activates the first remaining one.
    pub async fn delete_roadmap(&mut self, id: &RoadmapId) -> Result<(), WorkspaceError> {
        self.ensure_editable()?;
        if !self.registry.contains(id) {
            return Err(WorkspaceError::UnknownRoadmap(id.clone()));
        }
        let deleting_active = self.current_id() == id;

        if self.registry.len() == 1 {
            let replacement = match &mut self.authority {
                Authority::Local => RoadmapDocument::new_default(self.env.clock.now()),
                Authority::Remote(saver) => {
                    let remote = saver.remote().clone();
                    let replacement = remote.create(RoadmapPatch::default()).await?;
                    remote.delete(id).await?;
                    saver.cancel();
                    replacement
                }
            };
            info!(roadmap_id = %id, replacement = %replacement.id, "replaced last roadmap");
            self.registry = RoadmapRegistry::single(replacement.clone());
            self.show_created(replacement);
            return Ok(());
        }

        // An edit still pending for the active roadmap survives a failed delete
        if let Authority::Remote(saver) = &mut self.authority {
            saver.remote().delete(id).await?;
            if deleting_active {
                saver.cancel();
            }
        }
        let outcome = self.registry.remove(id)?;
        info!(roadmap_id = %id, "deleted roadmap");
        match outcome.new_current {
            Some(next) => {
                let doc = self.registry.select(&next)?.clone();
                self.show_existing(doc);
            }
            None => {
                if let Authority::Local = self.authority {
                    self.local.save(&self.registry);
                }
            }
        }
        Ok(())
    }

    /// Add a roadmap decoded from a share fragment and make it active
    pub async fn import_shared(
        &mut self,
        shared: SharedRoadmap,
    ) -> Result<RoadmapId, WorkspaceError> {
        self.ensure_editable()?;
        let now = self.now();
        let doc = match &mut self.authority {
            Authority::Local => shared.into_document(RoadmapId::new(), now),
            Authority::Remote(saver) => {
                saver.flush_and_wait().await;
                let content = shared.into_document(RoadmapId::new(), now);
                saver
                    .remote()
                    .create(RoadmapPatch::from_document(&content))
                    .await?
            }
        };
        let id = doc.id.clone();
        info!(roadmap_id = %id, "imported shared roadmap");
        self.show_created(doc);
        Ok(id)
    }

    /// Send an edit still waiting for the debounce window and wait for the store
    pub async fn flush(&mut self) {
        if let Authority::Remote(saver) = &mut self.authority {
            saver.flush_and_wait().await;
        }
    }

    /// Encoded `#share=` payload for the active document
    pub fn share_fragment(&self) -> String {
        encode_share_fragment(self.history.present())
    }

    /// Publish or unpublish the active roadmap at its public link
    pub async fn set_public(&mut self, is_public: bool) -> Result<RemoteRoadmap, WorkspaceError> {
        self.ensure_editable()?;
        let id = self.current_id().clone();
        Ok(self.remote()?.set_visibility(&id, is_public).await?)
    }

    /// Issue a token granting read access to the active roadmap
    pub async fn generate_share_token(&mut self) -> Result<String, WorkspaceError> {
        self.ensure_editable()?;
        let id = self.current_id().clone();
        Ok(self.remote()?.generate_share_token(&id).await?)
    }

    /// Invalidate the active roadmap's share token
    pub async fn revoke_share_token(&mut self) -> Result<RemoteRoadmap, WorkspaceError> {
        self.ensure_editable()?;
        let id = self.current_id().clone();
        Ok(self.remote()?.revoke_share_token(&id).await?)
    }
}
