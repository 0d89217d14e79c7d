//! Session status, end reason, and symbol enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a session. `active` is initial; both other states
/// are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Moves are accepted.
    Active,
    /// A participant won the series.
    Completed,
    /// Ended by forfeit or claimed win.
    Abandoned,
}

impl SessionStatus {
    /// Check if the session is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Winner reached the rounds-to-win target.
    SeriesWon,
    /// The loser gave up.
    Forfeit,
    /// The loser stayed disconnected past the grace period.
    ClaimedWin,
}

/// Mark placed on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// First participant.
    X,
    /// Second participant.
    O,
    /// Third participant.
    Y,
    /// Fourth participant.
    Z,
}

impl Symbol {
    /// Symbols in seating order.
    pub const ALL: [Symbol; 4] = [Self::X, Self::O, Self::Y, Self::Z];

    /// Symbol assigned to the participant at `index`, if one is left.
    pub fn for_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
            Self::Y => write!(f, "Y"),
            Self::Z => write!(f, "Z"),
        }
    }
}
