//! Real-time WebSocket configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Interval between `ping` envelopes on idle connections, in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive_interval_seconds: u64,
    /// How long a disconnected participant has to come back before the
    /// opponent may claim the win, in seconds.
    #[serde(default = "default_disconnect_grace")]
    pub disconnect_grace_seconds: u64,
    /// Maximum concurrent WebSocket connections per user.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
}

impl RealtimeConfig {
    /// Keepalive interval as a duration.
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_seconds)
    }

    /// Disconnect grace period as a duration.
    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_secs(self.disconnect_grace_seconds)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            keepalive_interval_seconds: default_keepalive(),
            disconnect_grace_seconds: default_disconnect_grace(),
            max_connections_per_user: default_max_connections_per_user(),
        }
    }
}

fn default_keepalive() -> u64 {
    30
}

fn default_disconnect_grace() -> u64 {
    15
}

fn default_max_connections_per_user() -> usize {
    8
}
