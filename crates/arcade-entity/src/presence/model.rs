//! Presence record value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PresenceStatus;

/// The presence record of an online user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// User ID.
    pub user_id: String,
    /// Display name.
    pub display_name: String,
    /// Current status.
    pub status: PresenceStatus,
    /// Application the user is in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_app: Option<String>,
    /// Last heartbeat timestamp.
    pub last_heartbeat: DateTime<Utc>,
}
