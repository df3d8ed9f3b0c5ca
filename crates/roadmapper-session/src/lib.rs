//! Editing sessions for roadmapper.
//!
//! A [`Workspace`] owns the undo [`History`] of the active document, the
//! [`RoadmapRegistry`] of all documents, and decides where they are
//! persisted: the local [`KeyValueStore`] while signed out, the remote store
//! (through a debounced saver) while signed in. Session changes and inbound
//! share links are handled by the controller methods on [`Workspace`].

pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod kv;
pub mod link;
pub mod local;
pub mod registry;
pub mod workspace;

pub use config::WorkspaceConfig;
pub use controller::SessionMode;
pub use error::WorkspaceError;
pub use history::{History, DEFAULT_HISTORY_CAP};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use link::{InboundLink, ViewMode};
pub use local::{LocalStore, LEGACY_STORAGE_KEY, STORAGE_KEY};
pub use registry::{RegistryError, RemoveOutcome, RoadmapRegistry};
pub use workspace::{Environment, Workspace};
