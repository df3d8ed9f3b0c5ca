//! Session transitions: mounting, sign-in and sign-out, and view links.
//!
//! On sign-in the remote list is fetched. An empty account receives a copy
//! of every local roadmap and local storage is cleared once at least one
//! copy succeeded; otherwise the remote list becomes the registry and local
//! storage is left alone. On sign-out the local registry is reloaded.
//!
//! While a view link is open, session changes are only recorded; the
//! registry is rebuilt when the viewer returns to editing.

use roadmapper_core::{decode_share_fragment, RoadmapDocument};
use roadmapper_sync::{DebouncedSaver, RemoteRoadmaps, RoadmapPatch, Session};
use tracing::{debug, error, info, warn};

use crate::error::WorkspaceError;
use crate::link::{InboundLink, ViewMode};
use crate::registry::RoadmapRegistry;
use crate::workspace::{Authority, Workspace};

/// Which store currently owns the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Anonymous,
    /// Signed in, remote registry still loading
    Authenticating,
    Authenticated,
}

impl Workspace {
    /// Start the session at `location` with the session known at startup.
    ///
    /// A view or embed link shows the linked roadmap read-only and skips the
    /// registry entirely. If it cannot be fetched the workspace falls back to
    /// normal editing. A `#share=` fragment is imported after the registry
    /// has loaded.
    pub async fn mount(
        &mut self,
        location: Option<&str>,
        session: Option<Session>,
    ) -> Result<(), WorkspaceError> {
        let link = location.and_then(InboundLink::parse);

        if let Some(link) = &link {
            if link.view_mode().is_read_only() {
                self.session = session;
                if self.open_view_link(link).await {
                    return Ok(());
                }
                let session = self.session.take();
                return self.mount_editor(session, None).await;
            }
        }

        let fragment = match link {
            Some(InboundLink::Fragment(data)) => Some(data),
            _ => None,
        };
        self.mount_editor(session, fragment).await
    }

    async fn open_view_link(&mut self, link: &InboundLink) -> bool {
        let store = self.env.store.clone();
        let fetched = match link {
            InboundLink::Share(token) => store.get_by_share_token(token).await,
            InboundLink::Public(id) | InboundLink::Embed(id) => store.get_public(id).await,
            InboundLink::Fragment(_) => return false,
        };
        match fetched {
            Ok(roadmap) => {
                info!(roadmap_id = %roadmap.id, mode = %link.view_mode(), "opened roadmap link");
                self.view_mode = link.view_mode();
                self.history.load(roadmap.to_document());
                true
            }
            Err(e) => {
                warn!(error = %e, "linked roadmap unavailable, opening editor");
                false
            }
        }
    }

    async fn mount_editor(
        &mut self,
        session: Option<Session>,
        fragment: Option<String>,
    ) -> Result<(), WorkspaceError> {
        self.view_mode = ViewMode::Edit;
        self.session = None;
        self.enter_anonymous();

        let signed_in = match session {
            Some(session) => self.handle_session_change(Some(session)).await,
            None => Ok(()),
        };

        if let Some(data) = fragment {
            match decode_share_fragment(&data) {
                Some(shared) => {
                    self.import_shared(shared).await?;
                }
                None => return Err(WorkspaceError::InvalidShareLink),
            }
        }
        signed_in
    }

    /// React to the auth layer reporting a new session (or none).
    ///
    /// Signing in with a failed remote list leaves the workspace signed out
    /// over local storage and returns the error.
    pub async fn handle_session_change(
        &mut self,
        next: Option<Session>,
    ) -> Result<(), WorkspaceError> {
        let previous = std::mem::replace(&mut self.session, next.clone());
        if self.view_mode.is_read_only() {
            debug!("session changed in view mode, deferring reload");
            return Ok(());
        }
        match next {
            None => {
                if previous.is_some() {
                    info!("signed out");
                    self.enter_anonymous();
                }
                Ok(())
            }
            Some(session) => match previous {
                Some(before) if before.user.id == session.user.id && self.is_authenticated() => {
                    // Same account with a refreshed token
                    if let Authority::Remote(saver) = &mut self.authority {
                        saver.flush_and_wait().await;
                    }
                    let remote = RemoteRoadmaps::new(self.env.store.clone(), session.token);
                    self.install_remote(remote);
                    Ok(())
                }
                Some(_) => {
                    info!(user_id = %session.user.id, "account switched");
                    self.enter_anonymous();
                    self.enter_authenticated(session).await
                }
                None => self.enter_authenticated(session).await,
            },
        }
    }

    /// Leave view or embed mode and load the user's own roadmaps
    pub async fn exit_view_mode(&mut self) -> Result<(), WorkspaceError> {
        if !self.view_mode.is_read_only() {
            return Ok(());
        }
        self.view_mode = ViewMode::Edit;
        self.enter_anonymous();
        match self.session.clone() {
            Some(session) => self.enter_authenticated(session).await,
            None => Ok(()),
        }
    }

    pub(crate) fn enter_anonymous(&mut self) {
        self.authority = Authority::Local;
        self.phase = SessionMode::Anonymous;
        self.registry = self.local.load();
        self.history.load(self.registry.current().clone());
    }

    async fn enter_authenticated(&mut self, session: Session) -> Result<(), WorkspaceError> {
        self.phase = SessionMode::Authenticating;
        info!(user_id = %session.user.id, "signed in, loading remote roadmaps");
        let remote = RemoteRoadmaps::new(self.env.store.clone(), session.token);

        let listed = match remote.list().await {
            Ok(listed) => listed,
            Err(e) => {
                error!(error = %e, "failed to load remote roadmaps, staying local");
                self.phase = SessionMode::Anonymous;
                return Err(e.into());
            }
        };

        let roadmaps = if listed.is_empty() {
            let migrated = self.migrate_local(&remote).await;
            if migrated.is_empty() {
                self.phase = SessionMode::Anonymous;
                return Err(WorkspaceError::MigrationFailed);
            }
            info!(count = migrated.len(), "copied local roadmaps to account");
            self.local.clear();
            migrated
        } else {
            debug!(count = listed.len(), "loaded remote roadmaps");
            listed
        };

        match RoadmapRegistry::from_documents(roadmaps, None) {
            Ok(registry) => {
                self.registry = registry;
                self.install_remote(remote);
                Ok(())
            }
            Err(e) => {
                self.phase = SessionMode::Anonymous;
                Err(e.into())
            }
        }
    }

    /// Create one remote roadmap per local one; failures are skipped
    async fn migrate_local(&self, remote: &RemoteRoadmaps) -> Vec<RoadmapDocument> {
        let mut migrated = Vec::with_capacity(self.registry.len());
        for doc in self.registry.roadmaps() {
            match remote.create(RoadmapPatch::from_document(doc)).await {
                Ok(created) => migrated.push(created),
                Err(e) => warn!(roadmap_id = %doc.id, error = %e, "failed to copy roadmap"),
            }
        }
        migrated
    }

    /// Switch persistence to `remote` and show the current registry member
    fn install_remote(&mut self, remote: RemoteRoadmaps) {
        if self.history.present() != self.registry.current() {
            self.history.load(self.registry.current().clone());
        }
        let mut saver = DebouncedSaver::new(remote, self.config.save_debounce);
        saver.mark_saved(self.history.present());
        self.authority = Authority::Remote(saver);
        self.phase = SessionMode::Authenticated;
    }
}
