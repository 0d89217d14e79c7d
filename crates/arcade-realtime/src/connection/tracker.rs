//! Session connection liveness and disconnect grace timers.
//!
//! The table is owned by this process. Replicas behind a load balancer
//! each see only their own connections, so a participant connected to
//! another replica looks disconnected here.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use arcade_core::result::AppResult;
use arcade_core::traits::ConnectionLiveness;
use arcade_core::traits::store::{EphemeralStore, StoreExt};
use arcade_core::types::SessionId;
use arcade_entity::event::{LobbyEvent, session_topic};
use arcade_entity::session::Session;
use arcade_service::SessionStore;

type Key = (SessionId, String);
type Departures = Arc<DashMap<Key, Departure>>;

/// A participant whose last session connection closed.
#[derive(Debug)]
struct Departure {
    /// When the last connection closed.
    since: Instant,
    /// Fires `claim_win_available` once the grace period ends, then
    /// watches the session until it is gone or finished.
    timer: JoinHandle<()>,
}

/// Tracks which participants hold an open session connection.
#[derive(Debug)]
pub struct SessionTracker {
    /// Store used for publishing.
    store: Arc<dyn EphemeralStore>,
    /// Session records, for the active check.
    sessions: Arc<SessionStore>,
    /// Grace period before a win may be claimed.
    grace: Duration,
    /// (session, user) → open connections.
    open: DashMap<Key, usize>,
    /// (session, user) → pending or elapsed grace period.
    away: Departures,
}

impl SessionTracker {
    /// Creates an empty tracker.
    pub fn new(store: Arc<dyn EphemeralStore>, sessions: Arc<SessionStore>, grace: Duration) -> Self {
        Self {
            store,
            sessions,
            grace,
            open: DashMap::new(),
            away: Arc::new(DashMap::new()),
        }
    }

    /// Record an opened session connection and return the session.
    ///
    /// Connections of non-participants are allowed but not tracked. A
    /// participant returning within the grace period cancels the timer and
    /// the session is told they are back.
    pub async fn connect(&self, session_id: SessionId, user_id: &str) -> AppResult<Session> {
        let session = self.sessions.get(session_id).await?;
        if !session.is_participant(user_id) {
            debug!(%session_id, %user_id, "Spectator connected");
            return Ok(session);
        }

        let key = (session_id, user_id.to_string());
        *self.open.entry(key.clone()).or_insert(0) += 1;

        if let Some((_, departure)) = self.away.remove(&key) {
            departure.timer.abort();
            if !session.status.is_terminal() {
                info!(
                    %session_id,
                    %user_id,
                    away_ms = departure.since.elapsed().as_millis() as u64,
                    "Participant reconnected"
                );
                self.announce(
                    session_id,
                    &LobbyEvent::OpponentReconnected {
                        user_id: user_id.to_string(),
                    },
                )
                .await;
            }
        }
        Ok(session)
    }

    /// Record a closed session connection.
    ///
    /// When a participant's last connection to an active session closes,
    /// the session is told and the grace timer starts.
    pub async fn disconnect(&self, session_id: SessionId, user_id: &str) {
        let key = (session_id, user_id.to_string());
        let remaining = match self.open.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let remaining = entry.get().saturating_sub(1);
                if remaining == 0 {
                    entry.remove();
                } else {
                    *entry.get_mut() = remaining;
                }
                remaining
            }
            Entry::Vacant(_) => return,
        };
        if remaining > 0 {
            return;
        }

        let session = match self.sessions.get(session_id).await {
            Ok(session) => session,
            Err(e) => {
                debug!(%session_id, error = %e, "Session gone, dropping liveness state");
                self.forget(session_id);
                return;
            }
        };
        if session.status.is_terminal() {
            self.forget(session_id);
            return;
        }
        if self.open.contains_key(&key) {
            // Reconnected while the session was loading.
            return;
        }

        info!(
            %session_id,
            %user_id,
            grace_seconds = self.grace.as_secs(),
            "Participant disconnected, grace period started"
        );
        self.announce(
            session_id,
            &LobbyEvent::OpponentDisconnected {
                user_id: user_id.to_string(),
                grace_seconds: self.grace.as_secs(),
            },
        )
        .await;

        let timer = tokio::spawn(expire_grace(
            Arc::clone(&self.store),
            Arc::clone(&self.sessions),
            Arc::clone(&self.away),
            session_id,
            user_id.to_string(),
            self.grace,
        ));
        let departure = Departure {
            since: Instant::now(),
            timer,
        };
        if let Some(previous) = self.away.insert(key, departure) {
            previous.timer.abort();
        }
    }

    /// Drop all liveness state of a session.
    pub fn forget(&self, session_id: SessionId) {
        forget_session(&self.away, session_id);
    }

    /// Open session connections across all sessions.
    pub fn connection_count(&self) -> usize {
        self.open.iter().map(|entry| *entry.value()).sum()
    }

    /// Grace periods that have not elapsed yet.
    pub fn pending_timers(&self) -> usize {
        self.away
            .iter()
            .filter(|entry| entry.value().since.elapsed() < self.grace)
            .count()
    }

    /// Participants currently recorded as away, elapsed or not.
    pub fn departures(&self) -> usize {
        self.away.len()
    }

    /// Cancel every timer. Used on shutdown.
    pub fn shutdown(&self) {
        let pending = self.pending_timers();
        for entry in self.away.iter() {
            entry.value().timer.abort();
        }
        self.away.clear();
        if pending > 0 {
            info!(pending, "Cancelled disconnect grace timers");
        }
    }

    async fn announce(&self, session_id: SessionId, event: &LobbyEvent) {
        publish(self.store.as_ref(), session_id, event).await;
    }
}

impl ConnectionLiveness for SessionTracker {
    fn disconnected_for(&self, session_id: &SessionId, user_id: &str) -> Option<Duration> {
        let key = (*session_id, user_id.to_string());
        if self.open.contains_key(&key) {
            return None;
        }
        self.away.get(&key).map(|departure| departure.since.elapsed())
    }

    fn grace_period(&self) -> Duration {
        self.grace
    }
}

fn forget_session(away: &DashMap<Key, Departure>, session_id: SessionId) {
    away.retain(|(id, _), departure| {
        if *id == session_id {
            departure.timer.abort();
            false
        } else {
            true
        }
    });
}

/// Whether the session still exists and accepts actions.
async fn still_active(sessions: &SessionStore, session_id: SessionId, user_id: &str) -> bool {
    match sessions.get(session_id).await {
        Ok(session) if !session.status.is_terminal() => true,
        Ok(_) => {
            debug!(%session_id, %user_id, "Session finished while participant away");
            false
        }
        Err(e) => {
            debug!(%session_id, %user_id, error = %e, "Session gone while participant away");
            false
        }
    }
}

/// Announce the elapsed grace period, then keep the departure until the
/// session ends. The entry backs `disconnected_for` for a later claim, so
/// it lives as long as the session does and is dropped with it.
async fn expire_grace(
    store: Arc<dyn EphemeralStore>,
    sessions: Arc<SessionStore>,
    away: Departures,
    session_id: SessionId,
    user_id: String,
    grace: Duration,
) {
    time::sleep(grace).await;
    if still_active(&sessions, session_id, &user_id).await {
        info!(%session_id, %user_id, "Grace period elapsed, win may be claimed");
        publish(
            store.as_ref(),
            session_id,
            &LobbyEvent::ClaimWinAvailable {
                user_id: user_id.clone(),
            },
        )
        .await;

        loop {
            time::sleep(grace).await;
            if !still_active(&sessions, session_id, &user_id).await {
                break;
            }
        }
    }
    forget_session(&away, session_id);
}

async fn publish(store: &dyn EphemeralStore, session_id: SessionId, event: &LobbyEvent) {
    if let Err(e) = store.publish_json(&session_topic(session_id), event).await {
        warn!(%session_id, event = event.event_type(), error = %e, "Failed to publish liveness event");
    }
}
