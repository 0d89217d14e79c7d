//! Session record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arcade_core::types::{ChallengeId, SessionId};

use super::{EndReason, SessionStatus, Symbol};

/// Number of slots on the 3×3 grid.
pub const BOARD_SLOTS: usize = 9;

/// Grid state, row-major. `None` is an empty slot.
pub type Board = [Option<Symbol>; BOARD_SLOTS];

/// A player seated in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// User ID.
    pub id: String,
    /// Display name at session creation.
    pub name: String,
    /// Assigned mark.
    pub symbol: Symbol,
}

/// Outcome of the last finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Round number that finished.
    pub round: u32,
    /// Round winner; `None` for a draw.
    pub winner: Option<String>,
    /// Winning line slots, if any.
    pub line: Option<[usize; 3]>,
}

/// Live state of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Challenge this session was created for.
    pub challenge_id: ChallengeId,
    /// Application that owns the session.
    pub app_id: String,
    /// Seated players, first mover first.
    pub participants: Vec<Participant>,
    /// Current round's grid.
    pub board: Board,
    /// User whose move it is.
    pub current_turn: String,
    /// Rounds won per participant.
    pub scores: BTreeMap<String, u32>,
    /// Current round number, starting at 1.
    pub round: u32,
    /// Rounds needed to win the series.
    pub rounds_to_win: u32,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Series winner once terminal.
    pub winner: Option<String>,
    /// Why the session ended.
    pub end_reason: Option<EndReason>,
    /// Outcome of the last finished round.
    pub last_round: Option<RoundResult>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last accepted move.
    pub last_move_at: Option<DateTime<Utc>>,
    /// Time the session became terminal.
    pub completed_at: Option<DateTime<Utc>>,
    /// Game options forwarded by the challenge.
    #[serde(default)]
    pub options: serde_json::Value,
    /// Write counter, bumped on every stored update.
    #[serde(default)]
    pub version: u64,
}

impl Session {
    /// Look up a participant by user ID.
    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == user_id)
    }

    /// Whether `user_id` is seated in this session.
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant(user_id).is_some()
    }

    /// The other participants in seating order, starting with the one
    /// seated after `user_id` and wrapping around. Empty for strangers.
    pub fn others_after(&self, user_id: &str) -> impl Iterator<Item = &Participant> {
        let seat = self.participants.iter().position(|p| p.id == user_id);
        let count = self.participants.len();
        let start = seat.map_or(count, |seat| seat + 1);
        let taken = if seat.is_some() { count.saturating_sub(1) } else { 0 };
        self.participants
            .iter()
            .cycle()
            .skip(start)
            .take(taken)
    }

    /// The participant who moves after `user_id`.
    pub fn next_after(&self, user_id: &str) -> Option<&Participant> {
        self.others_after(user_id).next()
    }

    /// Score of `user_id`, zero if unknown.
    pub fn score_of(&self, user_id: &str) -> u32 {
        self.scores.get(user_id).copied().unwrap_or(0)
    }

    /// Whether every slot is claimed.
    pub fn board_full(&self) -> bool {
        self.board.iter().all(Option::is_some)
    }
}
