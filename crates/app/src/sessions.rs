//! Shop session persistence seam.
//!
//! The session gate only ever talks to [`ShopSessionStore`]; which backend
//! sits behind it is a deployment decision. Production uses the
//! `PostgreSQL` implementation in [`crate::db::sessions`]; development and
//! the integration tests use [`InMemorySessionStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::ShopSession;

/// Errors that can occur during shop session persistence.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Persistence for mapping a session reference to stored API credentials.
#[async_trait]
pub trait ShopSessionStore: Send + Sync {
    /// Persist a session record and return its identifier.
    async fn store(&self, session: ShopSession) -> Result<Uuid, SessionStoreError>;

    /// Look up a session record by its identifier.
    async fn retrieve(&self, id: Uuid) -> Result<Option<ShopSession>, SessionStoreError>;

    /// Delete a session record. Deleting an unknown identifier is a no-op.
    async fn delete(&self, id: Uuid) -> Result<(), SessionStoreError>;

    /// Verify the backing store is reachable.
    async fn ping(&self) -> Result<(), SessionStoreError>;
}

/// In-memory session store.
///
/// Sessions do not survive a restart, so every merchant re-runs OAuth after
/// a deploy. Fine for development, wrong for production.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, ShopSession>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShopSessionStore for InMemorySessionStore {
    async fn store(&self, session: ShopSession) -> Result<Uuid, SessionStoreError> {
        let id = session.id;
        self.sessions.write().await.insert(id, session);
        Ok(id)
    }

    async fn retrieve(&self, id: Uuid) -> Result<Option<ShopSession>, SessionStoreError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), SessionStoreError> {
        self.sessions.write().await.remove(&id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), SessionStoreError> {
        Ok(())
    }
}
