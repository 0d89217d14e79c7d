//! Request DTOs.

use serde::{Deserialize, Serialize};

use arcade_entity::presence::PresenceStatus;

/// Presence heartbeat body. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    /// Display name; falls back to the `X-User-Name` header.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Presence status.
    #[serde(default)]
    pub status: PresenceStatus,
    /// Application the user is in.
    #[serde(default)]
    pub current_app: Option<String>,
}

/// Pairwise challenge body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChallengeRequest {
    /// Challenged user.
    pub to: String,
    /// Target application.
    pub app_id: String,
    /// Game options forwarded to the backend.
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Group challenge body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupChallengeRequest {
    /// Invited users.
    pub player_ids: Vec<String>,
    /// Target application.
    pub app_id: String,
    /// Acceptances needed to start.
    pub min_players: usize,
    /// Upper bound on invitees; defaults to the number invited.
    #[serde(default)]
    pub max_players: Option<usize>,
    /// Game options forwarded to the backend.
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Move body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Board slot, 0 to 8 row-major.
    pub position: i64,
}
