//! Shared fixtures for service tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use arcade_cache::memory::MemoryStore;
use arcade_core::config::LobbyConfig;
use arcade_core::config::store::MemoryStoreConfig;
use arcade_core::error::AppError;
use arcade_core::result::AppResult;
use arcade_core::traits::ConnectionLiveness;
use arcade_core::traits::store::EphemeralStore;
use arcade_core::types::{ChallengeId, SessionId};
use arcade_entity::presence::PresenceStatus;
use arcade_entity::session::Session;
use arcade_worker::{Outbox, OutboxReceiver};

use crate::backend::{
    BackendParticipant, BackendRegistry, GameBackend, LocalGridBackend, SessionRequest,
};
use crate::challenge::ChallengeService;
use crate::game::GameService;
use crate::game::grid;
use crate::orchestrator::MatchOrchestrator;
use crate::presence::PresenceService;
use crate::session::SessionStore;

/// Application id whose backend always fails.
pub(crate) const BROKEN_APP_ID: &str = "broken";

pub(crate) fn memory_store() -> Arc<dyn EphemeralStore> {
    Arc::new(MemoryStore::new(&MemoryStoreConfig::default()))
}

pub(crate) fn grid_session(a: &str, b: &str) -> Session {
    let players = vec![
        (a.to_string(), a.to_string()),
        (b.to_string(), b.to_string()),
    ];
    grid::new_session(
        ChallengeId::new(),
        "tictactoe",
        &players,
        1,
        serde_json::json!({}),
    )
    .unwrap()
}

/// Liveness table driven by the test.
#[derive(Debug, Default)]
pub(crate) struct TestLiveness {
    away: Mutex<HashMap<(SessionId, String), Duration>>,
}

impl TestLiveness {
    pub(crate) fn disconnect(&self, session_id: SessionId, user_id: &str, elapsed: Duration) {
        self.away
            .lock()
            .unwrap()
            .insert((session_id, user_id.to_string()), elapsed);
    }
}

impl ConnectionLiveness for TestLiveness {
    fn disconnected_for(&self, session_id: &SessionId, user_id: &str) -> Option<Duration> {
        self.away
            .lock()
            .unwrap()
            .get(&(*session_id, user_id.to_string()))
            .copied()
    }

    fn grace_period(&self) -> Duration {
        Duration::from_secs(15)
    }
}

#[derive(Debug)]
struct BrokenBackend;

#[async_trait]
impl GameBackend for BrokenBackend {
    fn name(&self) -> &str {
        "broken"
    }

    async fn create_session(&self, _request: &SessionRequest) -> AppResult<SessionId> {
        Err(AppError::internal("backend unavailable"))
    }
}

/// Every service wired to one in-memory store.
pub(crate) struct Harness {
    pub store: Arc<dyn EphemeralStore>,
    pub presence: Arc<PresenceService>,
    pub games: Arc<GameService>,
    pub challenges: Arc<ChallengeService>,
    pub orchestrator: MatchOrchestrator,
    pub outbox: Outbox,
    pub liveness: Arc<TestLiveness>,
    _outbox_rx: OutboxReceiver,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let config = LobbyConfig::default();
        let store = memory_store();
        let (outbox, outbox_rx) = Outbox::channel(64);
        let liveness = Arc::new(TestLiveness::default());

        let presence = Arc::new(PresenceService::new(Arc::clone(&store), config.clone()));
        let sessions = Arc::new(SessionStore::new(Arc::clone(&store), config.clone()));
        let games = Arc::new(GameService::new(
            sessions,
            Arc::clone(&store),
            liveness.clone(),
            outbox.clone(),
        ));

        let mut registry = BackendRegistry::new();
        registry.register("tictactoe", Arc::new(LocalGridBackend::new(Arc::clone(&games))));
        registry.register(BROKEN_APP_ID, Arc::new(BrokenBackend));
        let backends = Arc::new(registry);

        let challenges = Arc::new(ChallengeService::new(
            Arc::clone(&store),
            Arc::clone(&presence),
            Arc::clone(&backends),
            config,
        ));
        let orchestrator = MatchOrchestrator::new(
            Arc::clone(&challenges),
            Arc::clone(&presence),
            backends,
            Arc::clone(&store),
        );

        Self {
            store,
            presence,
            games,
            challenges,
            orchestrator,
            outbox,
            liveness,
            _outbox_rx: outbox_rx,
        }
    }

    /// Bring users online with a capitalized display name.
    pub(crate) async fn online(&self, users: &[&str]) {
        for user in users {
            let mut name = user.to_string();
            if let Some(first) = name.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            self.presence
                .heartbeat(user, &name, PresenceStatus::Online, None)
                .await
                .unwrap();
        }
    }

    /// Start a one-round grid session between two players.
    pub(crate) async fn start_grid(&self, a: &str, b: &str) -> Session {
        let request = SessionRequest {
            challenge_id: ChallengeId::new(),
            participants: [a, b]
                .iter()
                .map(|id| BackendParticipant {
                    id: id.to_string(),
                    name: id.to_string(),
                })
                .collect(),
            initiator_id: Some(a.to_string()),
            options: serde_json::Map::new(),
        };
        self.games.create_session(&request).await.unwrap()
    }
}
