//! Side-effect outbox configuration.

use serde::{Deserialize, Serialize};

/// Outbox worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum queued side effects before new ones are dropped.
    #[serde(default = "default_capacity")]
    pub outbox_capacity: usize,
    /// Side effects processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Attempts per side effect before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the first retry, doubled per attempt.
    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,
    /// Base URL of the match-history service. Empty logs records instead.
    #[serde(default)]
    pub archive_url: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: default_capacity(),
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff(),
            archive_url: String::new(),
        }
    }
}

fn default_capacity() -> usize {
    1024
}

fn default_concurrency() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_backoff() -> u64 {
    250
}
