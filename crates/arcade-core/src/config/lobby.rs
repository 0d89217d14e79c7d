//! Presence, challenge, and session lifetimes.
//!
//! Every lifetime here is enforced by store TTLs; there is no separate
//! expiry scheduler.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lobby lifetimes, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Presence record lifetime, refreshed on every heartbeat.
    #[serde(default = "default_presence_ttl")]
    pub presence_ttl_seconds: u64,
    /// Window for a pairwise challenge to be answered.
    #[serde(default = "default_pairwise_ttl")]
    pub pairwise_challenge_ttl_seconds: u64,
    /// Window for a group challenge to reach its threshold.
    #[serde(default = "default_group_ttl")]
    pub group_challenge_ttl_seconds: u64,
    /// Lifetime of a challenge once ready/accepted, long enough to create
    /// the session.
    #[serde(default = "default_ready_ttl")]
    pub ready_challenge_ttl_seconds: u64,
    /// Lifetime of a rejected or failed challenge.
    #[serde(default = "default_resolved_ttl")]
    pub resolved_challenge_ttl_seconds: u64,
    /// Lifetime of the per-user received/sent challenge queues.
    #[serde(default = "default_queue_ttl")]
    pub queue_ttl_seconds: u64,
    /// Session lifetime while active.
    #[serde(default = "default_session_active_ttl")]
    pub session_active_ttl_seconds: u64,
    /// Session lifetime once completed or abandoned.
    #[serde(default = "default_session_terminal_ttl")]
    pub session_terminal_ttl_seconds: u64,
}

impl LobbyConfig {
    /// Presence TTL.
    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_ttl_seconds)
    }

    /// Challenge TTL for the given kind.
    pub fn challenge_ttl(&self, group: bool) -> Duration {
        if group {
            Duration::from_secs(self.group_challenge_ttl_seconds)
        } else {
            Duration::from_secs(self.pairwise_challenge_ttl_seconds)
        }
    }

    /// TTL once a challenge is ready/accepted.
    pub fn ready_challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.ready_challenge_ttl_seconds)
    }

    /// TTL once a challenge is rejected/failed.
    pub fn resolved_challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.resolved_challenge_ttl_seconds)
    }

    /// Challenge queue TTL.
    pub fn queue_ttl(&self) -> Duration {
        Duration::from_secs(self.queue_ttl_seconds)
    }

    /// Session TTL for the given status.
    pub fn session_ttl(&self, terminal: bool) -> Duration {
        if terminal {
            Duration::from_secs(self.session_terminal_ttl_seconds)
        } else {
            Duration::from_secs(self.session_active_ttl_seconds)
        }
    }
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            presence_ttl_seconds: default_presence_ttl(),
            pairwise_challenge_ttl_seconds: default_pairwise_ttl(),
            group_challenge_ttl_seconds: default_group_ttl(),
            ready_challenge_ttl_seconds: default_ready_ttl(),
            resolved_challenge_ttl_seconds: default_resolved_ttl(),
            queue_ttl_seconds: default_queue_ttl(),
            session_active_ttl_seconds: default_session_active_ttl(),
            session_terminal_ttl_seconds: default_session_terminal_ttl(),
        }
    }
}

fn default_presence_ttl() -> u64 {
    30
}

fn default_pairwise_ttl() -> u64 {
    60
}

fn default_group_ttl() -> u64 {
    120
}

fn default_ready_ttl() -> u64 {
    30
}

fn default_resolved_ttl() -> u64 {
    10
}

fn default_queue_ttl() -> u64 {
    300
}

fn default_session_active_ttl() -> u64 {
    3600
}

fn default_session_terminal_ttl() -> u64 {
    60
}
