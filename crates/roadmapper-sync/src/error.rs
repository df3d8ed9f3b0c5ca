use thiserror::Error;

/// Failure reported by a [`crate::RoadmapStore`] or [`crate::AuthSession`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("not signed in: {0}")]
    Unauthorized(String),
    /// Network or server failure; the request may be retried later
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Errors worth showing to the user, as opposed to transient failures
    /// that are logged and left to the next save cycle
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, StoreError::Unavailable(_))
    }
}
