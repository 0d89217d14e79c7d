//! Top-level real-time engine that ties together connection accounting,
//! session liveness, and topic subscriptions.

use std::sync::Arc;

use futures::stream;
use tokio::sync::broadcast;
use tokio::time::Interval;
use tracing::{info, warn};

use arcade_core::config::RealtimeConfig;
use arcade_core::result::AppResult;
use arcade_core::traits::store::{EphemeralStore, TopicStream};
use arcade_core::types::SessionId;
use arcade_entity::event::{LobbyEvent, PRESENCE_TOPIC, session_topic, user_topic};
use arcade_entity::presence::PresenceStatus;
use arcade_service::{ChallengeService, PresenceService};

use crate::connection::keepalive;
use crate::connection::registry::ConnectionRegistry;
use crate::connection::tracker::SessionTracker;

/// An open subscription: the snapshot to send first, then the live events.
pub struct Subscription {
    /// `connected` envelope.
    pub snapshot: LobbyEvent,
    /// Raw event payloads to forward verbatim.
    pub events: TopicStream,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("snapshot", &self.snapshot.event_type())
            .finish_non_exhaustive()
    }
}

/// Central real-time engine shared by every WebSocket handler.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Per-user connection counts.
    pub connections: Arc<ConnectionRegistry>,
    /// Session liveness and grace timers.
    pub tracker: Arc<SessionTracker>,
    /// Store providing topic subscriptions.
    store: Arc<dyn EphemeralStore>,
    /// Presence registry for snapshots and connect/disconnect bookkeeping.
    presence: Arc<PresenceService>,
    /// Challenge coordinator for snapshots.
    challenges: Arc<ChallengeService>,
    /// Configuration.
    config: RealtimeConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine around an existing session tracker.
    pub fn new(
        config: RealtimeConfig,
        store: Arc<dyn EphemeralStore>,
        presence: Arc<PresenceService>,
        challenges: Arc<ChallengeService>,
        tracker: Arc<SessionTracker>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        info!(
            keepalive_seconds = config.keepalive_interval_seconds,
            grace_seconds = config.disconnect_grace_seconds,
            "Real-time engine initialized"
        );

        Self {
            connections: Arc::new(ConnectionRegistry::new(config.max_connections_per_user)),
            tracker,
            store,
            presence,
            challenges,
            config,
            shutdown_tx,
        }
    }

    /// Open a personal notification stream.
    ///
    /// Refreshes the user's presence, then subscribes to the personal and
    /// presence topics before taking the snapshot so nothing published in
    /// between is missed.
    pub async fn open_notifications(&self, user_id: &str, display_name: &str) -> AppResult<Subscription> {
        self.connections.open(user_id)?;
        match self.notification_subscription(user_id, display_name).await {
            Ok(subscription) => {
                info!(%user_id, "Notification stream opened");
                Ok(subscription)
            }
            Err(e) => {
                self.connections.close(user_id);
                Err(e)
            }
        }
    }

    async fn notification_subscription(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> AppResult<Subscription> {
        let personal = self.store.subscribe(&user_topic(user_id)).await?;
        let presence = self.store.subscribe(PRESENCE_TOPIC).await?;

        self.presence
            .heartbeat(user_id, display_name, PresenceStatus::Online, None)
            .await?;
        let online = self.presence.list_online().await?;
        let incoming = self.challenges.incoming(user_id).await?;

        Ok(Subscription {
            snapshot: LobbyEvent::Connected {
                user_id: user_id.to_string(),
                online,
                incoming,
                session: None,
            },
            events: Box::pin(stream::select(personal, presence)),
        })
    }

    /// Close a personal notification stream. The last one takes the user
    /// offline.
    pub async fn close_notifications(&self, user_id: &str) {
        let remaining = self.connections.close(user_id);
        if remaining == 0 {
            self.presence.remove(user_id).await;
        }
        info!(%user_id, remaining, "Notification stream closed");
    }

    /// Open a session stream. Participants are tracked for liveness.
    pub async fn open_session(&self, session_id: SessionId, user_id: &str) -> AppResult<Subscription> {
        self.connections.open(user_id)?;
        let subscribed = match self.store.subscribe(&session_topic(session_id)).await {
            Ok(events) => events,
            Err(e) => {
                self.connections.close(user_id);
                return Err(e);
            }
        };
        let session = match self.tracker.connect(session_id, user_id).await {
            Ok(session) => session,
            Err(e) => {
                self.connections.close(user_id);
                return Err(e);
            }
        };

        info!(%session_id, %user_id, "Session stream opened");
        Ok(Subscription {
            snapshot: LobbyEvent::Connected {
                user_id: user_id.to_string(),
                online: Vec::new(),
                incoming: Vec::new(),
                session: Some(Box::new(session)),
            },
            events: subscribed,
        })
    }

    /// Close a session stream.
    pub async fn close_session(&self, session_id: SessionId, user_id: &str) {
        self.connections.close(user_id);
        self.tracker.disconnect(session_id, user_id).await;
        info!(%session_id, %user_id, "Session stream closed");
    }

    /// Keepalive interval for one connection.
    pub fn keepalive(&self) -> Interval {
        keepalive::keepalive(self.config.keepalive_interval())
    }

    /// Total open WebSocket connections.
    pub fn connection_count(&self) -> usize {
        self.connections.connection_count()
    }

    /// Returns a shutdown receiver for connection loops.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal every connection loop to stop and cancel grace timers.
    pub fn shutdown(&self) {
        info!(connections = self.connection_count(), "Shutting down real-time engine");
        if self.shutdown_tx.send(()).is_err() {
            warn!("No connection loops were listening for shutdown");
        }
        self.tracker.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;
    use arcade_cache::memory::MemoryStore;
    use arcade_core::config::LobbyConfig;
    use arcade_core::config::store::MemoryStoreConfig;
    use arcade_core::error::ErrorKind;
    use arcade_service::{BackendRegistry, SessionStore};

    fn engine(max_per_user: usize) -> RealtimeEngine {
        let store: Arc<dyn EphemeralStore> =
            Arc::new(MemoryStore::new(&MemoryStoreConfig::default()));
        let lobby = LobbyConfig::default();
        let presence = Arc::new(PresenceService::new(Arc::clone(&store), lobby.clone()));
        let sessions = Arc::new(SessionStore::new(Arc::clone(&store), lobby.clone()));
        let challenges = Arc::new(ChallengeService::new(
            Arc::clone(&store),
            Arc::clone(&presence),
            Arc::new(BackendRegistry::new()),
            lobby,
        ));
        let tracker = Arc::new(SessionTracker::new(
            Arc::clone(&store),
            sessions,
            Duration::from_secs(15),
        ));
        let config = RealtimeConfig {
            max_connections_per_user: max_per_user,
            ..RealtimeConfig::default()
        };
        RealtimeEngine::new(config, store, presence, challenges, tracker)
    }

    #[tokio::test]
    async fn test_notifications_snapshot_and_presence() {
        let engine = engine(4);
        let mut alice = engine.open_notifications("alice", "Alice").await.unwrap();
        let LobbyEvent::Connected { online, .. } = &alice.snapshot else {
            panic!("expected connected snapshot");
        };
        assert_eq!(online.len(), 1);
        assert_eq!(engine.connection_count(), 1);

        let bob = engine.open_notifications("bob", "Bob").await.unwrap();
        let payload = alice.events.next().await.unwrap();
        let event: LobbyEvent = serde_json::from_str(&payload).unwrap();
        assert_eq!(event.event_type(), "presence_changed");

        drop(bob);
        engine.close_notifications("bob").await;
        assert!(!engine.presence.is_online("bob").await.unwrap());
        assert!(engine.presence.is_online("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_connection_cap() {
        let engine = engine(1);
        let _first = engine.open_notifications("alice", "Alice").await.unwrap();
        let err = engine.open_notifications("alice", "Alice").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PreconditionFailed);
        assert_eq!(engine.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_releases_slot() {
        let engine = engine(4);
        let err = engine.open_session(SessionId::new(), "alice").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(engine.connection_count(), 0);
    }
}
