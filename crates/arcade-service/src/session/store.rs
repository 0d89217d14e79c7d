//! Live session records with status-dependent expiry.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use arcade_cache::keys;
use arcade_core::config::LobbyConfig;
use arcade_core::error::AppError;
use arcade_core::result::AppResult;
use arcade_core::traits::store::{EphemeralStore, StoreExt};
use arcade_core::types::SessionId;
use arcade_entity::session::Session;

use crate::versioned;

/// Stores whole session records keyed by id.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Ephemeral store.
    store: Arc<dyn EphemeralStore>,
    /// Lobby lifetimes.
    config: LobbyConfig,
}

impl SessionStore {
    /// Creates a new session store.
    pub fn new(store: Arc<dyn EphemeralStore>, config: LobbyConfig) -> Self {
        Self { store, config }
    }

    fn ttl_for(&self, session: &Session) -> Duration {
        self.config.session_ttl(session.status.is_terminal())
    }

    /// Store a new session. `Conflict` if the id is taken.
    pub async fn create(&self, session: &Session) -> AppResult<()> {
        let json = serde_json::to_string(session)?;
        let created = self
            .store
            .set_nx(&keys::session(session.id), &json, self.ttl_for(session))
            .await?;
        if !created {
            return Err(AppError::conflict(format!(
                "Session {} already exists",
                session.id
            )));
        }
        debug!(session_id = %session.id, app_id = %session.app_id, "Session created");
        Ok(())
    }

    /// Fetch a session. `NotFound` if unknown or expired.
    pub async fn get(&self, session_id: SessionId) -> AppResult<Session> {
        self.store
            .get_json(&keys::session(session_id))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))
    }

    /// Overwrite a session the caller read earlier.
    ///
    /// The stored version must equal `session.version`; on success the
    /// version is bumped in place and the TTL reset for the new status.
    pub async fn replace(&self, session: &mut Session) -> AppResult<()> {
        let ttl = self.ttl_for(session);
        versioned::replace(
            self.store.as_ref(),
            &keys::session(session.id),
            session,
            ttl,
            "Session",
        )
        .await?;
        debug!(
            session_id = %session.id,
            version = session.version,
            status = %session.status,
            "Session replaced"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::error::ErrorKind;
    use crate::testing;

    #[tokio::test]
    async fn test_create_get_replace() {
        let sessions = SessionStore::new(testing::memory_store(), LobbyConfig::default());
        let session = testing::grid_session("alice", "bob");
        sessions.create(&session).await.unwrap();

        let mut loaded = sessions.get(session.id).await.unwrap();
        assert_eq!(loaded, session);

        loaded.round = 2;
        sessions.replace(&mut loaded).await.unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(sessions.get(session.id).await.unwrap().round, 2);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let sessions = SessionStore::new(testing::memory_store(), LobbyConfig::default());
        let session = testing::grid_session("alice", "bob");
        sessions.create(&session).await.unwrap();

        let mut first = sessions.get(session.id).await.unwrap();
        let mut second = sessions.get(session.id).await.unwrap();
        sessions.replace(&mut first).await.unwrap();

        let err = sessions.replace(&mut second).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.is_retryable());
        assert_eq!(second.version, 0);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let sessions = SessionStore::new(testing::memory_store(), LobbyConfig::default());
        let session = testing::grid_session("alice", "bob");
        sessions.create(&session).await.unwrap();
        let err = sessions.create(&session).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_missing_session_not_found() {
        let sessions = SessionStore::new(testing::memory_store(), LobbyConfig::default());
        let err = sessions.get(SessionId::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
