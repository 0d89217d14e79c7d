//! Open-connection counts per user.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use arcade_core::error::AppError;
use arcade_core::result::AppResult;

/// Counts open WebSocket connections per user and enforces the per-user
/// cap.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// User ID → open connections.
    open: DashMap<String, usize>,
    /// Cap per user.
    max_per_user: usize,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new(max_per_user: usize) -> Self {
        Self {
            open: DashMap::new(),
            max_per_user: max_per_user.max(1),
        }
    }

    /// Record a new connection. Returns the user's open count.
    pub fn open(&self, user_id: &str) -> AppResult<usize> {
        let mut count = self.open.entry(user_id.to_string()).or_insert(0);
        if *count >= self.max_per_user {
            warn!(%user_id, count = *count, max = self.max_per_user, "Connection cap reached");
            return Err(AppError::precondition_failed(format!(
                "User '{user_id}' already has {} open connections",
                *count
            )));
        }
        *count += 1;
        debug!(%user_id, count = *count, "Connection opened");
        Ok(*count)
    }

    /// Record a closed connection. Returns the user's remaining count.
    pub fn close(&self, user_id: &str) -> usize {
        match self.open.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let remaining = entry.get().saturating_sub(1);
                if remaining == 0 {
                    entry.remove();
                } else {
                    *entry.get_mut() = remaining;
                }
                debug!(%user_id, remaining, "Connection closed");
                remaining
            }
            Entry::Vacant(_) => 0,
        }
    }

    /// Total open connections.
    pub fn connection_count(&self) -> usize {
        self.open.iter().map(|entry| *entry.value()).sum()
    }
}
