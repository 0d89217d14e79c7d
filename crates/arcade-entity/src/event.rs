//! Realtime envelopes published on store topics and forwarded verbatim to
//! WebSocket clients.
//!
//! Every envelope serializes as `{"type": ..., "payload": ...}`; unit
//! variants carry no payload.

use serde::{Deserialize, Serialize};

use arcade_core::types::{ChallengeId, SessionId};

use crate::challenge::Challenge;
use crate::presence::PresenceRecord;
use crate::session::Session;

/// Global presence topic.
pub const PRESENCE_TOPIC: &str = "presence:updates";

/// Personal topic of a user.
pub fn user_topic(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Topic of a session.
pub fn session_topic(session_id: SessionId) -> String {
    format!("session:{session_id}")
}

/// Messages pushed from the server to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LobbyEvent {
    /// Initial snapshot sent on every (re)connection.
    Connected {
        /// Connected user.
        user_id: String,
        /// Users online at connect time.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        online: Vec<PresenceRecord>,
        /// Pending challenges addressed to the user.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        incoming: Vec<Challenge>,
        /// Session state for session connections.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<Box<Session>>,
    },
    /// A user came online, changed status, or went offline.
    PresenceChanged {
        /// User whose presence changed.
        user_id: String,
        /// New record; `None` once the user is offline.
        presence: Option<PresenceRecord>,
    },
    /// A new challenge addressed to the recipient.
    ChallengeReceived {
        /// The challenge.
        challenge: Box<Challenge>,
    },
    /// Progress or terminal update of a challenge.
    ChallengeUpdate {
        /// The challenge after the update.
        challenge: Box<Challenge>,
    },
    /// A session exists; connect to it.
    GameStarted {
        /// Application to open.
        app_id: String,
        /// Session to connect to.
        session_id: SessionId,
        /// Challenge that produced the session.
        challenge_id: ChallengeId,
    },
    /// Session state after an accepted move.
    SessionUpdate {
        /// The session.
        session: Box<Session>,
    },
    /// A participant dropped; the grace period started.
    OpponentDisconnected {
        /// Disconnected user.
        user_id: String,
        /// Grace period length.
        grace_seconds: u64,
    },
    /// A disconnected participant came back within the grace period.
    OpponentReconnected {
        /// Reconnected user.
        user_id: String,
    },
    /// The grace period elapsed; the remaining player may claim the win.
    ClaimWinAvailable {
        /// User who stayed disconnected.
        user_id: String,
    },
    /// The session reached a terminal state.
    GameEnded {
        /// Final session state.
        session: Box<Session>,
    },
    /// Keepalive.
    Ping,
}

impl LobbyEvent {
    /// Serialize the envelope to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Return the envelope type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::PresenceChanged { .. } => "presence_changed",
            Self::ChallengeReceived { .. } => "challenge_received",
            Self::ChallengeUpdate { .. } => "challenge_update",
            Self::GameStarted { .. } => "game_started",
            Self::SessionUpdate { .. } => "session_update",
            Self::OpponentDisconnected { .. } => "opponent_disconnected",
            Self::OpponentReconnected { .. } => "opponent_reconnected",
            Self::ClaimWinAvailable { .. } => "claim_win_available",
            Self::GameEnded { .. } => "game_ended",
            Self::Ping => "ping",
        }
    }
}
