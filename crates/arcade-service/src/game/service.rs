//! Grid game service: load, apply, store, announce.
//!
//! Every action reads the session, runs a pure transition from
//! [`grid`](super::grid), and writes it back with a version check. A
//! concurrent action on the same session turns into a retryable
//! `Conflict` instead of a lost update.

use std::sync::Arc;

use tracing::{debug, info};

use arcade_core::result::AppResult;
use arcade_core::traits::ConnectionLiveness;
use arcade_core::traits::store::EphemeralStore;
use arcade_core::types::SessionId;
use arcade_entity::event::{LobbyEvent, session_topic};
use arcade_entity::session::Session;
use arcade_worker::Outbox;

use super::grid::{self, RoundOutcome};
use crate::backend::SessionRequest;
use crate::notify;
use crate::session::SessionStore;

/// Application id of the built-in grid game.
pub const GRID_APP_ID: &str = "tictactoe";

/// Runs grid game sessions.
#[derive(Clone)]
pub struct GameService {
    /// Session records.
    sessions: Arc<SessionStore>,
    /// Store used for publishing.
    store: Arc<dyn EphemeralStore>,
    /// Connection liveness for claim-win checks.
    liveness: Arc<dyn ConnectionLiveness>,
    /// Side-effect outbox.
    outbox: Outbox,
}

impl std::fmt::Debug for GameService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameService")
            .field("sessions", &self.sessions)
            .field("outbox", &self.outbox)
            .finish_non_exhaustive()
    }
}

impl GameService {
    /// Creates a new game service.
    pub fn new(
        sessions: Arc<SessionStore>,
        store: Arc<dyn EphemeralStore>,
        liveness: Arc<dyn ConnectionLiveness>,
        outbox: Outbox,
    ) -> Self {
        Self {
            sessions,
            store,
            liveness,
            outbox,
        }
    }

    /// Create a grid session from a backend request.
    pub async fn create_session(&self, request: &SessionRequest) -> AppResult<Session> {
        let players: Vec<(String, String)> = request
            .participants
            .iter()
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect();
        let rounds_to_win = grid::rounds_to_win_option(&request.options);

        let session = grid::new_session(
            request.challenge_id,
            GRID_APP_ID,
            &players,
            rounds_to_win,
            serde_json::Value::Object(request.options.clone()),
        )?;
        self.sessions.create(&session).await?;

        info!(
            session_id = %session.id,
            challenge_id = %session.challenge_id,
            rounds_to_win = session.rounds_to_win,
            "Grid session started"
        );
        Ok(session)
    }

    /// Fetch a session.
    pub async fn get_session(&self, session_id: SessionId) -> AppResult<Session> {
        self.sessions.get(session_id).await
    }

    /// Place a mark for `user_id` and score the board.
    pub async fn make_move(
        &self,
        session_id: SessionId,
        user_id: &str,
        position: i64,
    ) -> AppResult<Session> {
        let mut session = self.sessions.get(session_id).await?;
        grid::apply_move(&mut session, user_id, position)?;
        let outcome = grid::evaluate_round(&mut session);
        self.sessions.replace(&mut session).await?;

        debug!(%session_id, %user_id, position, ?outcome, "Move applied");
        match outcome {
            RoundOutcome::RoundWon { ref winner } => {
                info!(%session_id, %winner, round = session.round - 1, "Round won");
            }
            RoundOutcome::Draw => info!(%session_id, round = session.round - 1, "Round drawn"),
            _ => {}
        }

        self.announce(&session).await;
        Ok(session)
    }

    /// Give up the match.
    pub async fn forfeit(&self, session_id: SessionId, user_id: &str) -> AppResult<Session> {
        let mut session = self.sessions.get(session_id).await?;
        grid::forfeit(&mut session, user_id)?;
        self.sessions.replace(&mut session).await?;
        info!(%session_id, %user_id, "Participant forfeited");

        self.announce(&session).await;
        Ok(session)
    }

    /// Win because the opponent stayed away past the grace period.
    pub async fn claim_win(&self, session_id: SessionId, user_id: &str) -> AppResult<Session> {
        let mut session = self.sessions.get(session_id).await?;
        grid::claim_win(&mut session, user_id, self.liveness.as_ref())?;
        self.sessions.replace(&mut session).await?;
        info!(%session_id, %user_id, "Win claimed after disconnect");

        self.announce(&session).await;
        Ok(session)
    }

    /// Push the new state to the session topic; on a terminal state also
    /// announce the end and queue the history writes.
    async fn announce(&self, session: &Session) {
        let topic = session_topic(session.id);
        notify::publish(
            self.store.as_ref(),
            &topic,
            &LobbyEvent::SessionUpdate {
                session: Box::new(session.clone()),
            },
        )
        .await;

        if session.status.is_terminal() {
            notify::publish(
                self.store.as_ref(),
                &topic,
                &LobbyEvent::GameEnded {
                    session: Box::new(session.clone()),
                },
            )
            .await;
            self.outbox.enqueue_finished(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::testing;
    use arcade_core::error::ErrorKind;
    use arcade_core::traits::store::EphemeralStore;
    use arcade_entity::session::SessionStatus;

    #[tokio::test]
    async fn test_move_publishes_and_finishes() {
        let harness = testing::Harness::new();
        let session = harness.start_grid("alice", "bob").await;
        let mut updates = harness
            .store
            .subscribe(&session_topic(session.id))
            .await
            .unwrap();

        for (user, pos) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4)] {
            harness.games.make_move(session.id, user, pos).await.unwrap();
        }
        let done = harness.games.make_move(session.id, "alice", 2).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.version, 5);

        let mut types = Vec::new();
        for _ in 0..6 {
            let payload = updates.next().await.unwrap();
            let event: LobbyEvent = serde_json::from_str(&payload).unwrap();
            types.push(event.event_type());
        }
        assert_eq!(types.last(), Some(&"game_ended"));

        // Archive plus one stat update per participant.
        assert_eq!(harness.outbox.depth(), 3);

        let err = harness.games.make_move(session.id, "bob", 5).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_rejected_move_leaves_stored_session() {
        let harness = testing::Harness::new();
        let session = harness.start_grid("alice", "bob").await;

        let err = harness.games.make_move(session.id, "bob", 0).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert_eq!(harness.games.get_session(session.id).await.unwrap(), session);
    }

    #[tokio::test]
    async fn test_forfeit_finishes_session() {
        let harness = testing::Harness::new();
        let session = harness.start_grid("alice", "bob").await;
        let done = harness.games.forfeit(session.id, "bob").await.unwrap();
        assert_eq!(done.status, SessionStatus::Abandoned);
        assert_eq!(done.winner.as_deref(), Some("alice"));
        assert_eq!(harness.outbox.depth(), 3);
    }

    #[tokio::test]
    async fn test_claim_win_blocked_while_connected() {
        let harness = testing::Harness::new();
        let session = harness.start_grid("alice", "bob").await;
        let err = harness.games.claim_win(session.id, "alice").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PreconditionFailed);

        harness.liveness.disconnect(session.id, "bob", std::time::Duration::from_secs(20));
        let done = harness.games.claim_win(session.id, "alice").await.unwrap();
        assert_eq!(done.winner.as_deref(), Some("alice"));
    }
}
