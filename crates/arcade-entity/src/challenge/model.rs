//! Challenge record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arcade_core::types::{ChallengeId, SessionId};

use super::{ChallengeKind, ChallengeStatus};

/// A proposal to start a match.
///
/// Pairwise challenges are the degenerate group case: `min_players` and
/// `max_players` are both 2, `invited` is `[initiator, recipient]`, and the
/// initiator starts out accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Time-ordered identifier.
    pub id: ChallengeId,
    /// User who issued the challenge.
    pub initiator: String,
    /// Pairwise or group.
    pub kind: ChallengeKind,
    /// Invited users, in invitation order.
    pub invited: Vec<String>,
    /// Users who accepted, in acceptance order.
    pub accepted: Vec<String>,
    /// Target application.
    pub app_id: String,
    /// Acceptances needed to start.
    pub min_players: usize,
    /// Upper bound on invitees.
    pub max_players: usize,
    /// Current status.
    pub status: ChallengeStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// End of the acceptance window.
    pub expires_at: DateTime<Utc>,
    /// Game options forwarded to the backend untouched.
    #[serde(default)]
    pub options: serde_json::Value,
    /// Session created for this challenge, once one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Write counter, bumped on every stored update.
    #[serde(default)]
    pub version: u64,
}

impl Challenge {
    /// The recipient of a pairwise challenge.
    pub fn recipient(&self) -> Option<&str> {
        match self.kind {
            ChallengeKind::Pairwise => self
                .invited
                .iter()
                .find(|id| **id != self.initiator)
                .map(String::as_str),
            ChallengeKind::Group => None,
        }
    }

    /// Whether `user_id` may accept this challenge.
    pub fn can_accept(&self, user_id: &str) -> bool {
        match self.kind {
            ChallengeKind::Pairwise => self.recipient() == Some(user_id),
            ChallengeKind::Group => self.invited.iter().any(|id| id == user_id),
        }
    }

    /// Whether `user_id` is the initiator or an invitee.
    pub fn involves(&self, user_id: &str) -> bool {
        self.initiator == user_id || self.invited.iter().any(|id| id == user_id)
    }

    /// Whether `user_id` already accepted.
    pub fn has_accepted(&self, user_id: &str) -> bool {
        self.accepted.iter().any(|id| id == user_id)
    }

    /// Whether enough players have accepted to start.
    pub fn threshold_reached(&self) -> bool {
        self.accepted.len() >= self.min_players
    }

    /// Players who take part in the session, first mover first.
    ///
    /// Pairwise: initiator then recipient. Group: accepted players in
    /// acceptance order.
    pub fn participants(&self) -> Vec<String> {
        match self.kind {
            ChallengeKind::Pairwise => {
                let mut players = vec![self.initiator.clone()];
                players.extend(self.recipient().map(str::to_string));
                players
            }
            ChallengeKind::Group => self.accepted.clone(),
        }
    }

    /// Users to notify about this challenge: initiator and every invitee,
    /// without duplicates.
    pub fn audience(&self) -> Vec<String> {
        let mut users = vec![self.initiator.clone()];
        for id in &self.invited {
            if !users.contains(id) {
                users.push(id.clone());
            }
        }
        users
    }
}
