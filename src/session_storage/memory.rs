//! In-process session storage.

use super::{SessionStorage, SessionStorageError};
use crate::auth::Session;
use crate::config::ShopDomain;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Session storage backed by a `HashMap` in memory.
///
/// Sessions are lost when the process exits. Share one instance behind an
/// `Arc` across request handlers.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn store_session(&self, session: &Session) -> Result<bool, SessionStorageError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, "Stored session in memory");
        Ok(true)
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>, SessionStorageError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn delete_session(&self, id: &str) -> Result<bool, SessionStorageError> {
        self.sessions.write().await.remove(id);
        Ok(true)
    }

    async fn delete_sessions(&self, ids: &[String]) -> Result<bool, SessionStorageError> {
        let mut sessions = self.sessions.write().await;
        for id in ids {
            sessions.remove(id);
        }
        Ok(true)
    }

    async fn find_sessions_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<Session>, SessionStorageError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|session| &session.shop == shop)
            .cloned()
            .collect())
    }
}
