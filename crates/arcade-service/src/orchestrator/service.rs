//! Drives a challenge from acceptance to a running session.
//!
//! The challenge coordinator decides *whether* a challenge resolved; the
//! orchestrator turns a resolved challenge into a session on the right
//! backend and tells every participant where to go.

use std::sync::Arc;

use tracing::{error, info};

use arcade_core::error::AppError;
use arcade_core::result::AppResult;
use arcade_core::traits::store::EphemeralStore;
use arcade_core::types::ChallengeId;
use arcade_entity::challenge::Challenge;
use arcade_entity::event::LobbyEvent;

use crate::backend::{BackendParticipant, BackendRegistry, SessionRequest};
use crate::challenge::{AcceptOutcome, ChallengeService};
use crate::notify;
use crate::presence::PresenceService;

/// Starts matches for resolved challenges.
#[derive(Debug, Clone)]
pub struct MatchOrchestrator {
    /// Challenge coordinator.
    challenges: Arc<ChallengeService>,
    /// Presence registry for display names.
    presence: Arc<PresenceService>,
    /// Game backends by application id.
    backends: Arc<BackendRegistry>,
    /// Store used for publishing.
    store: Arc<dyn EphemeralStore>,
}

impl MatchOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        challenges: Arc<ChallengeService>,
        presence: Arc<PresenceService>,
        backends: Arc<BackendRegistry>,
        store: Arc<dyn EphemeralStore>,
    ) -> Self {
        Self {
            challenges,
            presence,
            backends,
            store,
        }
    }

    /// Accept a challenge and start the match if it resolved.
    ///
    /// The returned challenge carries `session_id` once a session exists.
    pub async fn accept(&self, challenge_id: ChallengeId, user_id: &str) -> AppResult<Challenge> {
        match self.challenges.accept(challenge_id, user_id).await? {
            AcceptOutcome::Resolved(challenge) => self.start_match(&challenge).await,
            outcome => Ok(outcome.into_challenge()),
        }
    }

    /// Create a session for a resolved challenge and announce it.
    ///
    /// On backend failure the challenge is marked failed and the error is
    /// returned as `Internal`.
    pub async fn start_match(&self, challenge: &Challenge) -> AppResult<Challenge> {
        let participants = challenge.participants();

        let mut players = Vec::with_capacity(participants.len());
        for id in &participants {
            players.push(BackendParticipant {
                name: self.presence.display_name(id).await,
                id: id.clone(),
            });
        }

        let request = SessionRequest {
            challenge_id: challenge.id,
            participants: players,
            initiator_id: Some(challenge.initiator.clone()),
            options: match &challenge.options {
                serde_json::Value::Object(map) => map.clone(),
                _ => serde_json::Map::new(),
            },
        };

        let created = match self.backends.get(&challenge.app_id) {
            Ok(backend) => backend.create_session(&request).await,
            Err(e) => Err(e),
        };

        let session_id = match created {
            Ok(id) => id,
            Err(e) => {
                error!(
                    challenge_id = %challenge.id,
                    app_id = %challenge.app_id,
                    error = %e,
                    "Session creation failed"
                );
                if let Err(mark) = self.challenges.mark_failed(challenge.id).await {
                    error!(challenge_id = %challenge.id, error = %mark, "Failed to mark challenge failed");
                }
                return Err(AppError::internal(format!(
                    "Could not start {} session: {}",
                    challenge.app_id, e.message
                )));
            }
        };

        let challenge = self.challenges.record_session(challenge, session_id).await?;
        info!(
            challenge_id = %challenge.id,
            %session_id,
            app_id = %challenge.app_id,
            players = participants.len(),
            "Match started"
        );

        let event = LobbyEvent::GameStarted {
            app_id: challenge.app_id.clone(),
            session_id,
            challenge_id: challenge.id,
        };
        notify::publish_to_users(self.store.as_ref(), &participants, &event).await;

        Ok(challenge)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::testing::{self, BROKEN_APP_ID};
    use arcade_core::error::ErrorKind;
    use arcade_entity::challenge::ChallengeStatus;
    use arcade_entity::event::user_topic;
    use arcade_entity::session::SessionStatus;

    #[tokio::test]
    async fn test_pairwise_accept_starts_session() {
        let harness = testing::Harness::new();
        harness.online(&["alice", "bob"]).await;
        let mut alice_events = harness.store.subscribe(&user_topic("alice")).await.unwrap();

        let challenge = harness
            .challenges
            .create_challenge("alice", "bob", "tictactoe", serde_json::json!({}))
            .await
            .unwrap();
        let started = harness.orchestrator.accept(challenge.id, "bob").await.unwrap();

        assert_eq!(started.status, ChallengeStatus::Accepted);
        let session_id = started.session_id.expect("session recorded");
        let session = harness.games.get_session(session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.participants[0].id, "alice");
        assert_eq!(session.participants[0].name, "Alice");
        assert_eq!(session.current_turn, "alice");

        // challenge_update from the acceptance, then game_started.
        let mut types = Vec::new();
        for _ in 0..2 {
            let payload = alice_events.next().await.unwrap();
            let event: LobbyEvent = serde_json::from_str(&payload).unwrap();
            types.push(event.event_type());
        }
        assert_eq!(types, vec!["challenge_update", "game_started"]);
    }

    #[tokio::test]
    async fn test_repeat_accept_returns_existing_session() {
        let harness = testing::Harness::new();
        harness.online(&["alice", "bob"]).await;
        let challenge = harness
            .challenges
            .create_challenge("alice", "bob", "tictactoe", serde_json::json!({}))
            .await
            .unwrap();

        let first = harness.orchestrator.accept(challenge.id, "bob").await.unwrap();
        let second = harness.orchestrator.accept(challenge.id, "bob").await.unwrap();
        assert_eq!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn test_group_starts_with_first_acceptors() {
        let harness = testing::Harness::new();
        harness.online(&["x", "y", "z", "w"]).await;
        let players: Vec<String> = ["y", "z", "w"].iter().map(|s| s.to_string()).collect();
        let challenge = harness
            .challenges
            .create_multi_challenge("x", &players, "tictactoe", 2, 3, serde_json::json!({}))
            .await
            .unwrap();

        let waiting = harness.orchestrator.accept(challenge.id, "z").await.unwrap();
        assert_eq!(waiting.status, ChallengeStatus::Pending);
        assert!(waiting.session_id.is_none());

        let ready = harness.orchestrator.accept(challenge.id, "w").await.unwrap();
        assert_eq!(ready.status, ChallengeStatus::Ready);
        let session = harness
            .games
            .get_session(ready.session_id.unwrap())
            .await
            .unwrap();
        let ids: Vec<&str> = session.participants.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "w"]);

        let err = harness.orchestrator.accept(challenge.id, "y").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_three_player_group_gets_a_session() {
        let harness = testing::Harness::new();
        harness.online(&["x", "y", "z", "w"]).await;
        let players: Vec<String> = ["x", "y", "z", "w"].iter().map(|s| s.to_string()).collect();
        let challenge = harness
            .challenges
            .create_multi_challenge("x", &players, "tictactoe", 3, 5, serde_json::json!({}))
            .await
            .unwrap();

        for user in ["y", "z"] {
            let waiting = harness.orchestrator.accept(challenge.id, user).await.unwrap();
            assert_eq!(waiting.status, ChallengeStatus::Pending);
        }
        let ready = harness.orchestrator.accept(challenge.id, "w").await.unwrap();
        assert_eq!(ready.status, ChallengeStatus::Ready);

        let session = harness
            .games
            .get_session(ready.session_id.expect("session recorded"))
            .await
            .unwrap();
        let ids: Vec<&str> = session.participants.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["y", "z", "w"]);
        assert_eq!(session.current_turn, "y");

        let moved = harness.games.make_move(session.id, "y", 4).await.unwrap();
        assert_eq!(moved.current_turn, "z");
    }

    #[tokio::test]
    async fn test_backend_failure_marks_challenge_failed() {
        let harness = testing::Harness::new();
        harness.online(&["alice", "bob"]).await;
        let challenge = harness
            .challenges
            .create_challenge("alice", "bob", BROKEN_APP_ID, serde_json::json!({}))
            .await
            .unwrap();

        let err = harness.orchestrator.accept(challenge.id, "bob").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);

        let stored = harness.challenges.get(challenge.id).await.unwrap();
        assert_eq!(stored.status, ChallengeStatus::Failed);
        assert!(harness.challenges.incoming("bob").await.unwrap().is_empty());
    }
}
