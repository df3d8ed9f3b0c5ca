//! In-process backend implementing both [`RoadmapStore`] and [`AuthSession`].
//!
//! Holds accounts, sessions, roadmaps and collaborator grants behind one
//! mutex and applies the same access rules as the hosted service. Call
//! counters and an "unavailable" switch make it usable as a test double.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use roadmapper_core::{Clock, RoadmapId, Styling, TimelineEntry, Timestamp, DEFAULT_TITLE};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthSession, AuthToken, Session, User, UserId};
use crate::error::StoreError;
use crate::store::{Permission, RemoteRoadmap, RoadmapPatch, RoadmapStore};

/// Longest title the store accepts
const MAX_TITLE_CHARS: usize = 200;

/// Number of calls received per store operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub create: usize,
    pub get: usize,
    pub update: usize,
    pub delete: usize,
    pub duplicate: usize,
}

/// A registered user.
///
/// The password is held and compared in plaintext. This backend lives only
/// as long as the process, the CLI included, and must not back a real
/// deployment.
struct Account {
    user: User,
    password: String,
}

struct StoredRoadmap {
    owner_id: UserId,
    title: String,
    entries: Vec<TimelineEntry>,
    style: Styling,
    is_public: bool,
    share_token: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

#[derive(Default)]
struct BackendState {
    accounts: HashMap<UserId, Account>,
    sessions: HashMap<String, UserId>,
    roadmaps: HashMap<RoadmapId, StoredRoadmap>,
    collaborators: HashMap<(RoadmapId, UserId), Permission>,
    calls: CallCounts,
    unavailable: bool,
    last_stamp: Timestamp,
}

impl BackendState {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("backend is offline".into()));
        }
        Ok(())
    }

    fn caller(&self, auth: &AuthToken) -> Result<UserId, StoreError> {
        self.sessions
            .get(&auth.0)
            .cloned()
            .ok_or_else(|| StoreError::Unauthorized("session expired or invalid".into()))
    }

    fn stamp(&mut self, now: Timestamp) -> Timestamp {
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }

    fn permission(&self, id: &RoadmapId, user: &UserId) -> Option<Permission> {
        let roadmap = self.roadmaps.get(id)?;
        if &roadmap.owner_id == user {
            return Some(Permission::Owner);
        }
        self.collaborators.get(&(id.clone(), user.clone())).copied()
    }

    fn view(&self, id: &RoadmapId, permission: Permission) -> Result<RemoteRoadmap, StoreError> {
        let stored = self
            .roadmaps
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("roadmap {id}")))?;
        Ok(RemoteRoadmap {
            id: id.clone(),
            owner_id: stored.owner_id.clone(),
            title: stored.title.clone(),
            entries: stored.entries.clone(),
            style: stored.style.clone(),
            is_public: stored.is_public,
            share_token: stored.share_token.clone(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            permission,
        })
    }

    /// Owner-only operations: missing roadmap is `NotFound`, anyone else is `Forbidden`
    fn require_owner(&self, id: &RoadmapId, user: &UserId) -> Result<(), StoreError> {
        match self.permission(id, user) {
            Some(Permission::Owner) => Ok(()),
            Some(_) => Err(StoreError::Forbidden("only the owner may do that".into())),
            None if self.roadmaps.contains_key(id) => {
                Err(StoreError::Forbidden("only the owner may do that".into()))
            }
            None => Err(StoreError::NotFound(format!("roadmap {id}"))),
        }
    }

    fn insert(
        &mut self,
        owner: UserId,
        title: String,
        entries: Vec<TimelineEntry>,
        style: Styling,
        now: Timestamp,
    ) -> RoadmapId {
        let id = RoadmapId::new();
        let stamp = self.stamp(now);
        self.roadmaps.insert(
            id.clone(),
            StoredRoadmap {
                owner_id: owner,
                title,
                entries,
                style,
                is_public: false,
                share_token: None,
                created_at: stamp,
                updated_at: stamp,
            },
        );
        id
    }
}

fn validate(patch: &RoadmapPatch) -> Result<(), StoreError> {
    if let Some(title) = &patch.title {
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(StoreError::Validation(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }
    }
    if let Some(entries) = &patch.entries {
        if entries.iter().any(|entry| entry.id.as_str().is_empty()) {
            return Err(StoreError::Validation("entry id must not be empty".into()));
        }
    }
    Ok(())
}

fn new_token() -> String {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    hex::encode(bytes)
}

/// Shared in-process backend.
///
/// Passwords are kept in plaintext and nothing outlives the process.
pub struct MemoryBackend {
    state: Mutex<BackendState>,
    clock: Arc<dyn Clock>,
}

impl MemoryBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(BackendState::default()),
            clock,
        }
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }

    pub fn roadmap_count(&self) -> usize {
        self.state().roadmaps.len()
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Session, StoreError> {
        let mut state = self.state();
        state.check_available()?;
        if email.trim().is_empty() || !email.contains('@') {
            return Err(StoreError::Validation("a valid email is required".into()));
        }
        if password.is_empty() {
            return Err(StoreError::Validation("password must not be empty".into()));
        }
        if state.accounts.values().any(|a| a.user.email == email) {
            return Err(StoreError::Validation("email already registered".into()));
        }
        let user = User {
            id: UserId(Uuid::new_v4().to_string()),
            email: email.to_string(),
            name: name.map(str::to_string),
        };
        state.accounts.insert(
            user.id.clone(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        let token = new_token();
        state.sessions.insert(token.clone(), user.id.clone());
        info!(user_id = %user.id, "account registered");
        Ok(Session {
            user,
            token: AuthToken(token),
        })
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, StoreError> {
        let mut state = self.state();
        state.check_available()?;
        let user = state
            .accounts
            .values()
            .find(|a| a.user.email == email && a.password == password)
            .map(|a| a.user.clone())
            .ok_or_else(|| StoreError::Unauthorized("invalid email or password".into()))?;
        let token = new_token();
        state.sessions.insert(token.clone(), user.id.clone());
        Ok(Session {
            user,
            token: AuthToken(token),
        })
    }

    pub fn logout(&self, token: &AuthToken) {
        self.state().sessions.remove(&token.0);
    }

    /// Grant `email` access to a roadmap owned by the caller
    pub fn invite_collaborator(
        &self,
        auth: &AuthToken,
        id: &RoadmapId,
        email: &str,
        permission: Permission,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        state.check_available()?;
        let caller = state.caller(auth)?;
        state.require_owner(id, &caller)?;
        if permission == Permission::Owner {
            return Err(StoreError::Validation("permission must be view or edit".into()));
        }
        let invitee = state
            .accounts
            .values()
            .find(|a| a.user.email == email)
            .map(|a| a.user.id.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {email}")))?;
        if invitee == caller {
            return Err(StoreError::Validation("cannot invite yourself".into()));
        }
        state.collaborators.insert((id.clone(), invitee), permission);
        Ok(())
    }
}

#[async_trait]
impl RoadmapStore for MemoryBackend {
    async fn list(&self, auth: &AuthToken) -> Result<Vec<RemoteRoadmap>, StoreError> {
        let mut state = self.state();
        state.calls.list += 1;
        state.check_available()?;
        let caller = state.caller(auth)?;

        let mut visible: Vec<(Timestamp, RoadmapId, Permission)> = state
            .roadmaps
            .iter()
            .filter_map(|(id, roadmap)| {
                state
                    .permission(id, &caller)
                    .map(|permission| (roadmap.updated_at, id.clone(), permission))
            })
            .collect();
        visible.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        visible
            .into_iter()
            .map(|(_, id, permission)| state.view(&id, permission))
            .collect()
    }

    async fn create(
        &self,
        auth: &AuthToken,
        patch: RoadmapPatch,
    ) -> Result<RemoteRoadmap, StoreError> {
        let now = self.clock.now();
        let mut state = self.state();
        state.calls.create += 1;
        state.check_available()?;
        let caller = state.caller(auth)?;
        validate(&patch)?;

        let mut title = DEFAULT_TITLE.to_string();
        let mut entries = Vec::new();
        let mut style = Styling::default();
        patch.apply(&mut title, &mut entries, &mut style);
        let id = state.insert(caller, title, entries, style, now);
        state.view(&id, Permission::Owner)
    }

    async fn get(&self, auth: &AuthToken, id: &RoadmapId) -> Result<RemoteRoadmap, StoreError> {
        let mut state = self.state();
        state.calls.get += 1;
        state.check_available()?;
        let caller = state.caller(auth)?;
        let is_public = state
            .roadmaps
            .get(id)
            .map(|r| r.is_public)
            .ok_or_else(|| StoreError::NotFound(format!("roadmap {id}")))?;
        match state.permission(id, &caller) {
            Some(permission) => state.view(id, permission),
            None if is_public => state.view(id, Permission::View),
            None => Err(StoreError::Forbidden("access denied".into())),
        }
    }

    async fn get_public(&self, id: &RoadmapId) -> Result<RemoteRoadmap, StoreError> {
        let mut state = self.state();
        state.calls.get += 1;
        state.check_available()?;
        match state.roadmaps.get(id) {
            Some(roadmap) if roadmap.is_public => state.view(id, Permission::View),
            _ => Err(StoreError::NotFound(format!("roadmap {id} not found or not public"))),
        }
    }

    async fn get_by_share_token(&self, token: &str) -> Result<RemoteRoadmap, StoreError> {
        let mut state = self.state();
        state.calls.get += 1;
        state.check_available()?;
        let id = state
            .roadmaps
            .iter()
            .find(|(_, roadmap)| roadmap.share_token.as_deref() == Some(token))
            .map(|(id, _)| id.clone())
            .ok_or_else(|| StoreError::NotFound("share link".into()))?;
        state.view(&id, Permission::View)
    }

    async fn update(
        &self,
        auth: &AuthToken,
        id: &RoadmapId,
        patch: RoadmapPatch,
    ) -> Result<RemoteRoadmap, StoreError> {
        let now = self.clock.now();
        let mut state = self.state();
        state.calls.update += 1;
        state.check_available()?;
        let caller = state.caller(auth)?;
        validate(&patch)?;

        let permission = match state.permission(id, &caller) {
            Some(permission) => permission,
            None if state.roadmaps.contains_key(id) => {
                return Err(StoreError::Forbidden("access denied".into()));
            }
            None => return Err(StoreError::NotFound(format!("roadmap {id}"))),
        };
        if !permission.can_edit() {
            return Err(StoreError::Forbidden(
                "you do not have permission to edit this roadmap".into(),
            ));
        }

        let stamp = state.stamp(now);
        if let Some(roadmap) = state.roadmaps.get_mut(id) {
            patch.apply(&mut roadmap.title, &mut roadmap.entries, &mut roadmap.style);
            roadmap.updated_at = stamp;
        }
        state.view(id, permission)
    }

    async fn delete(&self, auth: &AuthToken, id: &RoadmapId) -> Result<(), StoreError> {
        let mut state = self.state();
        state.calls.delete += 1;
        state.check_available()?;
        let caller = state.caller(auth)?;
        state.require_owner(id, &caller)?;
        state.roadmaps.remove(id);
        state.collaborators.retain(|(roadmap, _), _| roadmap != id);
        Ok(())
    }

    async fn duplicate(
        &self,
        auth: &AuthToken,
        id: &RoadmapId,
    ) -> Result<RemoteRoadmap, StoreError> {
        let now = self.clock.now();
        let mut state = self.state();
        state.calls.duplicate += 1;
        state.check_available()?;
        let caller = state.caller(auth)?;

        let readable = state.permission(id, &caller).is_some()
            || state.roadmaps.get(id).is_some_and(|r| r.is_public);
        let source = state
            .roadmaps
            .get(id)
            .filter(|_| readable)
            .ok_or_else(|| StoreError::NotFound(format!("roadmap {id} not found or access denied")))?;
        let title = format!("{} (Copy)", source.title);
        let entries = source.entries.clone();
        let style = source.style.clone();

        let copy = state.insert(caller, title, entries, style, now);
        state.view(&copy, Permission::Owner)
    }

    async fn set_visibility(
        &self,
        auth: &AuthToken,
        id: &RoadmapId,
        is_public: bool,
    ) -> Result<RemoteRoadmap, StoreError> {
        let mut state = self.state();
        state.check_available()?;
        let caller = state.caller(auth)?;
        state.require_owner(id, &caller)?;
        if let Some(roadmap) = state.roadmaps.get_mut(id) {
            roadmap.is_public = is_public;
        }
        state.view(id, Permission::Owner)
    }

    async fn issue_share_token(
        &self,
        auth: &AuthToken,
        id: &RoadmapId,
    ) -> Result<String, StoreError> {
        let mut state = self.state();
        state.check_available()?;
        let caller = state.caller(auth)?;
        state.require_owner(id, &caller)?;
        let token = new_token();
        if let Some(roadmap) = state.roadmaps.get_mut(id) {
            roadmap.share_token = Some(token.clone());
        }
        Ok(token)
    }

    async fn revoke_share_token(
        &self,
        auth: &AuthToken,
        id: &RoadmapId,
    ) -> Result<RemoteRoadmap, StoreError> {
        let mut state = self.state();
        state.check_available()?;
        let caller = state.caller(auth)?;
        state.require_owner(id, &caller)?;
        if let Some(roadmap) = state.roadmaps.get_mut(id) {
            roadmap.share_token = None;
        }
        state.view(id, Permission::Owner)
    }
}

/// [`AuthSession`] over a [`MemoryBackend`]
pub struct MemoryAuth {
    backend: Arc<MemoryBackend>,
    current: watch::Sender<Option<Session>>,
}

impl MemoryAuth {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        let (current, _) = watch::channel(None);
        Self { backend, current }
    }
}

#[async_trait]
impl AuthSession for MemoryAuth {
    fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, StoreError> {
        let session = self.backend.login(email, password)?;
        self.current.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Session, StoreError> {
        let session = self.backend.register(email, password, name)?;
        self.current.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn logout(&self) -> Result<(), StoreError> {
        if let Some(session) = self.current.send_replace(None) {
            self.backend.logout(&session.token);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use roadmapper_core::ManualClock;

    use super::*;

    fn backend() -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::new(Arc::new(ManualClock::new(1_000))))
    }

    #[tokio::test]
    async fn create_fills_defaults_and_owner() {
        let backend = backend();
        let ada = backend.register("ada@example.com", "pw", Some("Ada")).unwrap();
        let created = backend.create(&ada.token, RoadmapPatch::default()).await.unwrap();
        assert_eq!(created.title, "My Roadmap");
        assert_eq!(created.owner_id, ada.user.id);
        assert_eq!(created.permission, Permission::Owner);
        assert!(created.entries.is_empty());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_includes_shared() {
        let backend = backend();
        let ada = backend.register("ada@example.com", "pw", None).unwrap();
        let bob = backend.register("bob@example.com", "pw", None).unwrap();

        let first = backend.create(&ada.token, RoadmapPatch::default()).await.unwrap();
        let second = backend.create(&ada.token, RoadmapPatch::default()).await.unwrap();
        let listed = backend.list(&ada.token).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        backend
            .invite_collaborator(&ada.token, &first.id, "bob@example.com", Permission::Edit)
            .unwrap();
        let shared = backend.list(&bob.token).await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].permission, Permission::Edit);
    }

    #[tokio::test]
    async fn permissions_are_enforced() {
        let backend = backend();
        let ada = backend.register("ada@example.com", "pw", None).unwrap();
        let bob = backend.register("bob@example.com", "pw", None).unwrap();
        let doc = backend.create(&ada.token, RoadmapPatch::default()).await.unwrap();

        let edit = RoadmapPatch {
            title: Some("Bob's".into()),
            ..RoadmapPatch::default()
        };
        assert!(matches!(
            backend.update(&bob.token, &doc.id, edit.clone()).await,
            Err(StoreError::Forbidden(_))
        ));

        backend
            .invite_collaborator(&ada.token, &doc.id, "bob@example.com", Permission::View)
            .unwrap();
        assert!(matches!(
            backend.update(&bob.token, &doc.id, edit.clone()).await,
            Err(StoreError::Forbidden(_))
        ));

        backend
            .invite_collaborator(&ada.token, &doc.id, "bob@example.com", Permission::Edit)
            .unwrap();
        let updated = backend.update(&bob.token, &doc.id, edit).await.unwrap();
        assert_eq!(updated.title, "Bob's");
        assert!(updated.updated_at > doc.updated_at);

        assert!(matches!(
            backend.delete(&bob.token, &doc.id).await,
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            backend.delete(&ada.token, &RoadmapId::from("nope")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn validation_rejects_long_titles() {
        let backend = backend();
        let ada = backend.register("ada@example.com", "pw", None).unwrap();
        let patch = RoadmapPatch {
            title: Some("x".repeat(201)),
            ..RoadmapPatch::default()
        };
        assert!(matches!(
            backend.create(&ada.token, patch).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn share_token_and_public_reads() {
        let backend = backend();
        let ada = backend.register("ada@example.com", "pw", None).unwrap();
        let doc = backend.create(&ada.token, RoadmapPatch::default()).await.unwrap();

        assert!(backend.get_public(&doc.id).await.is_err());
        backend.set_visibility(&ada.token, &doc.id, true).await.unwrap();
        assert_eq!(backend.get_public(&doc.id).await.unwrap().permission, Permission::View);

        let token = backend.issue_share_token(&ada.token, &doc.id).await.unwrap();
        assert_eq!(token.len(), 64);
        assert_eq!(backend.get_by_share_token(&token).await.unwrap().id, doc.id);

        backend.revoke_share_token(&ada.token, &doc.id).await.unwrap();
        assert!(matches!(
            backend.get_by_share_token(&token).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_copies_into_callers_account() {
        let backend = backend();
        let ada = backend.register("ada@example.com", "pw", None).unwrap();
        let bob = backend.register("bob@example.com", "pw", None).unwrap();
        let doc = backend.create(&ada.token, RoadmapPatch::default()).await.unwrap();

        assert!(backend.duplicate(&bob.token, &doc.id).await.is_err());
        backend.set_visibility(&ada.token, &doc.id, true).await.unwrap();
        let copy = backend.duplicate(&bob.token, &doc.id).await.unwrap();
        assert_eq!(copy.title, "My Roadmap (Copy)");
        assert_eq!(copy.owner_id, bob.user.id);
    }

    #[tokio::test]
    async fn auth_session_publishes_changes() {
        let backend = backend();
        let auth = MemoryAuth::new(backend.clone());
        let mut changes = auth.subscribe();

        assert!(matches!(
            auth.login("ada@example.com", "pw").await,
            Err(StoreError::Unauthorized(_))
        ));
        let session = auth.register("ada@example.com", "pw", None).await.unwrap();
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().as_ref(), Some(&session));

        auth.logout().await.unwrap();
        assert_eq!(*changes.borrow_and_update(), None);
        assert!(matches!(
            backend.list(&session.token).await,
            Err(StoreError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn unavailable_backend_fails_every_call() {
        let backend = backend();
        let ada = backend.register("ada@example.com", "pw", None).unwrap();
        backend.set_unavailable(true);
        let err = backend.list(&ada.token).await.unwrap_err();
        assert!(!err.is_user_facing());
        assert_eq!(backend.calls().list, 1);
    }
}
