//! Account session contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bearer credential for authenticated store calls
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthToken(pub String);

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
}

/// A signed-in user together with the credential for their store calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: AuthToken,
}

/// Who is signed in, and the means to change it.
///
/// Every change is published on the channel returned by [`subscribe`];
/// that is the "session changed" event the editor reacts to.
///
/// [`subscribe`]: AuthSession::subscribe
#[async_trait]
pub trait AuthSession: Send + Sync {
    fn current(&self) -> Option<Session>;

    fn subscribe(&self) -> watch::Receiver<Option<Session>>;

    async fn login(&self, email: &str, password: &str) -> Result<Session, StoreError>;

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Session, StoreError>;

    async fn logout(&self) -> Result<(), StoreError>;
}
