//! Remote persistence for roadmapper.
//!
//! This crate defines the contracts the editor consumes from the outside
//! world ([`RoadmapStore`] for documents, [`AuthSession`] for accounts), the
//! [`RemoteRoadmaps`] adapter that binds a store to a signed-in session, and
//! the [`DebouncedSaver`] that turns a stream of edits into occasional
//! `update` calls.
//!
//! [`MemoryBackend`] implements both contracts in-process. It backs the
//! command-line host and the test suites.

pub mod auth;
pub mod debounce;
pub mod error;
pub mod memory;
pub mod remote;
pub mod store;

pub use auth::{AuthSession, AuthToken, Session, User, UserId};
pub use debounce::{DebouncedSaver, DEFAULT_SAVE_DEBOUNCE};
pub use error::StoreError;
pub use memory::{CallCounts, MemoryAuth, MemoryBackend};
pub use remote::RemoteRoadmaps;
pub use store::{Permission, RemoteRoadmap, RoadmapPatch, RoadmapStore};
