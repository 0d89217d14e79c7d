//! Presence domain records.

pub mod model;

pub use model::PresenceRecord;

use serde::{Deserialize, Serialize};

/// What an online user is currently doing.
///
/// There is no offline variant: a missing presence record means offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Browsing the lobby.
    #[default]
    Online,
    /// Playing a match.
    InGame,
    /// Tab hidden or idle.
    Away,
}

impl PresenceStatus {
    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::InGame => "in_game",
            Self::Away => "away",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
