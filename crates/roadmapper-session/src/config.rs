use std::time::Duration;

use roadmapper_sync::DEFAULT_SAVE_DEBOUNCE;

use crate::history::DEFAULT_HISTORY_CAP;

/// Tunables for a [`crate::Workspace`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Maximum number of undo snapshots kept
    pub history_cap: usize,
    /// Quiet period after the last edit before saving to the remote store
    pub save_debounce: Duration,
}

impl WorkspaceConfig {
    pub fn with_history_cap(mut self, history_cap: usize) -> Self {
        self.history_cap = history_cap;
        self
    }

    pub fn with_save_debounce(mut self, save_debounce: Duration) -> Self {
        self.save_debounce = save_debounce;
        self
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
        }
    }
}
