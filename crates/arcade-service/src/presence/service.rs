//! Presence registry: who is online and what they are doing.
//!
//! A user is online exactly while their presence key exists. Every
//! heartbeat rewrites the record with a fresh TTL; there is no explicit
//! offline state.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use arcade_cache::keys;
use arcade_core::config::LobbyConfig;
use arcade_core::error::AppError;
use arcade_core::result::AppResult;
use arcade_core::traits::store::{EphemeralStore, StoreExt};
use arcade_entity::event::{LobbyEvent, PRESENCE_TOPIC};
use arcade_entity::presence::{PresenceRecord, PresenceStatus};

use crate::notify;

/// Presence registry service.
#[derive(Debug, Clone)]
pub struct PresenceService {
    /// Ephemeral store.
    store: Arc<dyn EphemeralStore>,
    /// Lobby lifetimes.
    config: LobbyConfig,
}

impl PresenceService {
    /// Creates a new presence service.
    pub fn new(store: Arc<dyn EphemeralStore>, config: LobbyConfig) -> Self {
        Self { store, config }
    }

    /// Write or refresh a user's presence and announce it.
    pub async fn heartbeat(
        &self,
        user_id: &str,
        display_name: &str,
        status: PresenceStatus,
        current_app: Option<String>,
    ) -> AppResult<PresenceRecord> {
        if user_id.trim().is_empty() {
            return Err(AppError::invalid_argument("User id must not be empty"));
        }

        let display_name = match display_name.trim() {
            "" => user_id.to_string(),
            name => name.to_string(),
        };

        let record = PresenceRecord {
            user_id: user_id.to_string(),
            display_name,
            status,
            current_app: current_app.filter(|app| !app.is_empty()),
            last_heartbeat: Utc::now(),
        };

        self.store
            .set_json(&keys::presence(user_id), &record, self.config.presence_ttl())
            .await?;
        debug!(%user_id, status = %record.status, "Presence refreshed");

        notify::publish(
            self.store.as_ref(),
            PRESENCE_TOPIC,
            &LobbyEvent::PresenceChanged {
                user_id: user_id.to_string(),
                presence: Some(record.clone()),
            },
        )
        .await;

        Ok(record)
    }

    /// Drop a user's presence. Failures are logged and swallowed.
    pub async fn remove(&self, user_id: &str) {
        if let Err(e) = self.store.delete(&keys::presence(user_id)).await {
            warn!(%user_id, error = %e, "Failed to remove presence");
            return;
        }
        info!(%user_id, "User went offline");

        notify::publish(
            self.store.as_ref(),
            PRESENCE_TOPIC,
            &LobbyEvent::PresenceChanged {
                user_id: user_id.to_string(),
                presence: None,
            },
        )
        .await;
    }

    /// Whether a user currently has a presence record.
    pub async fn is_online(&self, user_id: &str) -> AppResult<bool> {
        self.store.exists(&keys::presence(user_id)).await
    }

    /// Fetch a user's presence record.
    pub async fn get(&self, user_id: &str) -> AppResult<Option<PresenceRecord>> {
        self.store.get_json(&keys::presence(user_id)).await
    }

    /// Display name of a user, falling back to the id once presence expired.
    pub async fn display_name(&self, user_id: &str) -> String {
        match self.get(user_id).await {
            Ok(Some(record)) => record.display_name,
            Ok(None) => user_id.to_string(),
            Err(e) => {
                warn!(%user_id, error = %e, "Presence lookup failed, using id as name");
                user_id.to_string()
            }
        }
    }

    /// Every online user, sorted by display name.
    ///
    /// Scans all presence keys; sized for a lobby of tens of users.
    pub async fn list_online(&self) -> AppResult<Vec<PresenceRecord>> {
        let keys = self.store.keys(&keys::presence_pattern()).await?;
        let mut records = Vec::with_capacity(keys.len());

        for key in keys {
            // Keys can expire between the scan and the read.
            let record: AppResult<Option<PresenceRecord>> = self.store.get_json(&key).await;
            match record {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!(%key, error = %e, "Skipping unreadable presence record"),
            }
        }

        records.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(records)
    }
}
