//! Challenge kind and status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    /// One initiator, one recipient.
    Pairwise,
    /// Many invitees with a minimum-player threshold.
    Group,
}

/// Lifecycle status of a challenge.
///
/// `pending` moves to `ready` (group) or `accepted` (pairwise) exactly
/// once. Every other transition out of `pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// Waiting for acceptances.
    Pending,
    /// Group threshold reached, session being created.
    Ready,
    /// Pairwise challenge accepted, session being created.
    Accepted,
    /// Declined or cancelled.
    Rejected,
    /// Window elapsed without resolution.
    Expired,
    /// Session creation failed after resolution.
    Failed,
}

impl ChallengeStatus {
    /// Whether the challenge reached `ready` or `accepted`.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Ready | Self::Accepted)
    }

    /// Check if the challenge can no longer progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Expired | Self::Failed)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
