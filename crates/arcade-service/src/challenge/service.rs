//! Challenge coordinator.
//!
//! Challenges live only in the ephemeral store. Their TTL is the only
//! expiry mechanism: a challenge nobody answers simply disappears, and
//! per-user queues drop dangling ids the next time they are read.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use arcade_cache::keys;
use arcade_core::config::LobbyConfig;
use arcade_core::error::AppError;
use arcade_core::result::AppResult;
use arcade_core::traits::store::{EphemeralStore, StoreExt};
use arcade_core::types::{ChallengeId, SessionId};
use arcade_entity::challenge::{Challenge, ChallengeKind, ChallengeStatus};
use arcade_entity::event::{LobbyEvent, user_topic};

use super::outcome::AcceptOutcome;
use crate::backend::BackendRegistry;
use crate::presence::PresenceService;
use crate::{notify, versioned};

/// Creates, resolves, and lists challenges.
#[derive(Debug, Clone)]
pub struct ChallengeService {
    /// Ephemeral store.
    store: Arc<dyn EphemeralStore>,
    /// Presence registry for online checks.
    presence: Arc<PresenceService>,
    /// Known applications.
    backends: Arc<BackendRegistry>,
    /// Lobby lifetimes.
    config: LobbyConfig,
}

/// Which per-user queue to read.
#[derive(Debug, Clone, Copy)]
enum Queue {
    Received,
    Sent,
}

impl ChallengeService {
    /// Creates a new challenge service.
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        presence: Arc<PresenceService>,
        backends: Arc<BackendRegistry>,
        config: LobbyConfig,
    ) -> Self {
        Self {
            store,
            presence,
            backends,
            config,
        }
    }

    fn ensure_known_app(&self, app_id: &str) -> AppResult<()> {
        if !self.backends.contains(app_id) {
            return Err(AppError::invalid_argument(format!(
                "Unknown application '{app_id}'"
            )));
        }
        Ok(())
    }

    /// Challenge `to` to a two-player match.
    pub async fn create_challenge(
        &self,
        from: &str,
        to: &str,
        app_id: &str,
        options: serde_json::Value,
    ) -> AppResult<Challenge> {
        if to.trim().is_empty() {
            return Err(AppError::invalid_argument("Challenge target must not be empty"));
        }
        if from == to {
            return Err(AppError::invalid_argument("Cannot challenge yourself"));
        }
        self.ensure_known_app(app_id)?;
        if !self.presence.is_online(to).await? {
            return Err(AppError::precondition_failed(format!(
                "User '{to}' is not online"
            )));
        }

        let ttl = self.config.challenge_ttl(false);
        let challenge = new_challenge(
            from,
            ChallengeKind::Pairwise,
            vec![from.to_string(), to.to_string()],
            vec![from.to_string()],
            app_id,
            (2, 2),
            options,
            ttl,
        );

        self.claim_pair_guard(from, to, challenge.id, ttl).await?;
        if let Err(e) = self.store.set_json(&keys::challenge(challenge.id), &challenge, ttl).await {
            self.release_pair_guard(&challenge).await;
            return Err(e);
        }

        self.push_queue(Queue::Received, to, challenge.id).await?;
        self.push_queue(Queue::Sent, from, challenge.id).await?;

        info!(challenge_id = %challenge.id, %from, %to, %app_id, "Challenge created");
        notify::publish(
            self.store.as_ref(),
            &user_topic(to),
            &LobbyEvent::ChallengeReceived {
                challenge: Box::new(challenge.clone()),
            },
        )
        .await;

        Ok(challenge)
    }

    /// Invite several players to a match that starts once `min_players`
    /// of them accepted.
    pub async fn create_multi_challenge(
        &self,
        initiator: &str,
        player_ids: &[String],
        app_id: &str,
        min_players: usize,
        max_players: usize,
        options: serde_json::Value,
    ) -> AppResult<Challenge> {
        validate_group(player_ids, min_players, max_players)?;
        self.ensure_known_app(app_id)?;
        if let Some(seats) = self.backends.max_participants(app_id) {
            if min_players > seats {
                return Err(AppError::invalid_argument(format!(
                    "'{app_id}' seats at most {seats} players, min_players is {min_players}"
                )));
            }
        }

        for player in player_ids.iter().filter(|p| *p != initiator) {
            if !self.presence.is_online(player).await? {
                return Err(AppError::precondition_failed(format!(
                    "User '{player}' is not online"
                )));
            }
        }

        let ttl = self.config.challenge_ttl(true);
        let challenge = new_challenge(
            initiator,
            ChallengeKind::Group,
            player_ids.to_vec(),
            Vec::new(),
            app_id,
            (min_players, max_players),
            options,
            ttl,
        );
        self.store
            .set_json(&keys::challenge(challenge.id), &challenge, ttl)
            .await?;

        let event = LobbyEvent::ChallengeReceived {
            challenge: Box::new(challenge.clone()),
        };
        for player in player_ids.iter().filter(|p| *p != initiator) {
            self.push_queue(Queue::Received, player, challenge.id).await?;
            notify::publish(self.store.as_ref(), &user_topic(player), &event).await;
        }
        self.push_queue(Queue::Sent, initiator, challenge.id).await?;

        info!(
            challenge_id = %challenge.id,
            %initiator,
            invited = player_ids.len(),
            min_players,
            max_players,
            %app_id,
            "Group challenge created"
        );
        Ok(challenge)
    }

    /// Fetch a challenge. `NotFound` if unknown or expired.
    pub async fn get(&self, challenge_id: ChallengeId) -> AppResult<Challenge> {
        self.find(challenge_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Challenge {challenge_id} not found")))
    }

    async fn find(&self, challenge_id: ChallengeId) -> AppResult<Option<Challenge>> {
        let challenge: Option<Challenge> =
            self.store.get_json(&keys::challenge(challenge_id)).await?;
        Ok(challenge)
    }

    /// Record `user_id`'s acceptance.
    pub async fn accept(&self, challenge_id: ChallengeId, user_id: &str) -> AppResult<AcceptOutcome> {
        let mut challenge = self.get(challenge_id).await?;

        if !challenge.can_accept(user_id) {
            return Err(AppError::forbidden(format!(
                "User '{user_id}' is not invited to this challenge"
            )));
        }

        if challenge.status.is_resolved() {
            if challenge.has_accepted(user_id) {
                if challenge.session_id.is_some() {
                    return Ok(AcceptOutcome::AlreadyStarted(challenge));
                }
                return Err(AppError::conflict("Challenge already accepted"));
            }
            return Err(AppError::invalid_state(format!(
                "Challenge is already {}",
                challenge.status
            )));
        }
        if challenge.status != ChallengeStatus::Pending {
            return Err(AppError::invalid_state(format!(
                "Challenge is {}",
                challenge.status
            )));
        }
        if challenge.has_accepted(user_id) {
            return Err(AppError::conflict("Challenge already accepted"));
        }

        challenge.accepted.push(user_id.to_string());

        let resolved = match challenge.kind {
            ChallengeKind::Pairwise => {
                challenge.status = ChallengeStatus::Accepted;
                true
            }
            ChallengeKind::Group if challenge.threshold_reached() => {
                challenge.status = ChallengeStatus::Ready;
                true
            }
            ChallengeKind::Group => false,
        };

        let ttl = if resolved {
            self.config.ready_challenge_ttl()
        } else {
            remaining_ttl(&challenge)
        };
        if resolved {
            challenge.expires_at = Utc::now() + chrono_duration(ttl);
        }
        self.save(&mut challenge, ttl).await?;

        if challenge.kind == ChallengeKind::Pairwise {
            self.release_pair_guard(&challenge).await;
            self.remove_from_queues(&challenge).await;
        }

        info!(
            %challenge_id,
            %user_id,
            accepted = challenge.accepted.len(),
            min_players = challenge.min_players,
            status = %challenge.status,
            "Challenge accepted"
        );
        notify::publish(
            self.store.as_ref(),
            &user_topic(&challenge.initiator),
            &LobbyEvent::ChallengeUpdate {
                challenge: Box::new(challenge.clone()),
            },
        )
        .await;

        Ok(if resolved {
            AcceptOutcome::Resolved(challenge)
        } else {
            AcceptOutcome::Waiting(challenge)
        })
    }

    /// Decline (invitee) or cancel (initiator) a pending challenge.
    pub async fn reject(&self, challenge_id: ChallengeId, user_id: &str) -> AppResult<Challenge> {
        let mut challenge = self.get(challenge_id).await?;

        if !challenge.involves(user_id) {
            return Err(AppError::forbidden(format!(
                "User '{user_id}' is not part of this challenge"
            )));
        }
        if challenge.status != ChallengeStatus::Pending {
            return Err(AppError::invalid_state(format!(
                "Challenge is {}",
                challenge.status
            )));
        }

        challenge.status = ChallengeStatus::Rejected;
        let ttl = self.config.resolved_challenge_ttl();
        challenge.expires_at = Utc::now() + chrono_duration(ttl);
        self.save(&mut challenge, ttl).await?;

        self.release_pair_guard(&challenge).await;
        self.remove_from_queues(&challenge).await;

        info!(%challenge_id, %user_id, "Challenge rejected");
        let event = LobbyEvent::ChallengeUpdate {
            challenge: Box::new(challenge.clone()),
        };
        let others: Vec<String> = challenge
            .audience()
            .into_iter()
            .filter(|u| u != user_id)
            .collect();
        notify::publish_to_users(self.store.as_ref(), &others, &event).await;

        Ok(challenge)
    }

    /// Attach the created session to a resolved challenge.
    pub async fn record_session(
        &self,
        challenge: &Challenge,
        session_id: SessionId,
    ) -> AppResult<Challenge> {
        let mut updated = challenge.clone();
        updated.session_id = Some(session_id);
        let ttl = remaining_ttl(&updated);
        self.save(&mut updated, ttl).await?;
        debug!(challenge_id = %updated.id, %session_id, "Session recorded on challenge");
        Ok(updated)
    }

    /// Move a resolved challenge to `failed` after session creation broke.
    pub async fn mark_failed(&self, challenge_id: ChallengeId) -> AppResult<Challenge> {
        let mut challenge = self.get(challenge_id).await?;
        challenge.status = ChallengeStatus::Failed;
        let ttl = self.config.resolved_challenge_ttl();
        challenge.expires_at = Utc::now() + chrono_duration(ttl);
        self.save(&mut challenge, ttl).await?;
        self.remove_from_queues(&challenge).await;

        warn!(%challenge_id, "Challenge marked failed");
        let event = LobbyEvent::ChallengeUpdate {
            challenge: Box::new(challenge.clone()),
        };
        notify::publish_to_users(self.store.as_ref(), &challenge.audience(), &event).await;
        Ok(challenge)
    }

    /// Pending or ready challenges addressed to `user_id`.
    pub async fn incoming(&self, user_id: &str) -> AppResult<Vec<Challenge>> {
        self.read_queue(Queue::Received, user_id).await
    }

    /// Pending or ready challenges issued by `user_id`.
    pub async fn outgoing(&self, user_id: &str) -> AppResult<Vec<Challenge>> {
        self.read_queue(Queue::Sent, user_id).await
    }

    /// Read a queue, dropping ids whose challenge expired or ended.
    async fn read_queue(&self, queue: Queue, user_id: &str) -> AppResult<Vec<Challenge>> {
        let key = queue_key(queue, user_id);
        let ids = self.store.list_range(&key).await?;
        let mut seen = HashSet::new();
        let mut challenges = Vec::new();

        for raw_id in ids {
            if !seen.insert(raw_id.clone()) {
                continue;
            }
            let live = match raw_id.parse::<ChallengeId>() {
                Ok(id) => self.find(id).await?,
                Err(_) => None,
            };
            match live {
                Some(c) if matches!(c.status, ChallengeStatus::Pending | ChallengeStatus::Ready) => {
                    challenges.push(c);
                }
                _ => {
                    debug!(%key, challenge_id = %raw_id, "Dropping dangling challenge id");
                    if let Err(e) = self.store.list_remove(&key, &raw_id).await {
                        warn!(%key, error = %e, "Failed to clean challenge queue");
                    }
                }
            }
        }

        challenges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(challenges)
    }

    async fn save(&self, challenge: &mut Challenge, ttl: Duration) -> AppResult<()> {
        versioned::replace(
            self.store.as_ref(),
            &keys::challenge(challenge.id),
            challenge,
            ttl,
            "Challenge",
        )
        .await
    }

    async fn push_queue(&self, queue: Queue, user_id: &str, id: ChallengeId) -> AppResult<()> {
        self.store
            .list_push(&queue_key(queue, user_id), &id.to_string(), self.config.queue_ttl())
            .await
    }

    async fn remove_from_queues(&self, challenge: &Challenge) {
        let id = challenge.id.to_string();
        let mut targets = vec![queue_key(Queue::Sent, &challenge.initiator)];
        targets.extend(
            challenge
                .invited
                .iter()
                .filter(|u| **u != challenge.initiator)
                .map(|u| queue_key(Queue::Received, u)),
        );
        for key in targets {
            if let Err(e) = self.store.list_remove(&key, &id).await {
                warn!(%key, error = %e, "Failed to remove challenge from queue");
            }
        }
    }

    /// Take the one-pending-challenge-per-pair guard.
    async fn claim_pair_guard(
        &self,
        from: &str,
        to: &str,
        id: ChallengeId,
        ttl: Duration,
    ) -> AppResult<()> {
        let guard = keys::challenge_pair(from, to);
        let value = id.to_string();
        if self.store.set_nx(&guard, &value, ttl).await? {
            return Ok(());
        }

        // The guard may outlive the challenge it protects if a release
        // failed; take it over only when that challenge is no longer pending.
        let Some(holder) = self.store.get(&guard).await? else {
            if self.store.set_nx(&guard, &value, ttl).await? {
                return Ok(());
            }
            return Err(pair_conflict(from, to));
        };
        let still_pending = match holder.parse::<ChallengeId>() {
            Ok(holder_id) => matches!(
                self.find(holder_id).await?,
                Some(c) if c.status == ChallengeStatus::Pending
            ),
            Err(_) => false,
        };
        if still_pending {
            return Err(pair_conflict(from, to));
        }
        if self.store.compare_and_swap(&guard, &holder, &value, ttl).await? {
            return Ok(());
        }
        Err(pair_conflict(from, to))
    }

    async fn release_pair_guard(&self, challenge: &Challenge) {
        let Some(recipient) = challenge.recipient() else {
            return;
        };
        let guard = keys::challenge_pair(&challenge.initiator, recipient);
        match self.store.get(&guard).await {
            Ok(Some(holder)) if holder == challenge.id.to_string() => {
                if let Err(e) = self.store.delete(&guard).await {
                    warn!(%guard, error = %e, "Failed to release pair guard");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(%guard, error = %e, "Failed to read pair guard"),
        }
    }
}

fn pair_conflict(from: &str, to: &str) -> AppError {
    AppError::conflict(format!(
        "A pending challenge between '{from}' and '{to}' already exists"
    ))
}

fn queue_key(queue: Queue, user_id: &str) -> String {
    match queue {
        Queue::Received => keys::challenges_received(user_id),
        Queue::Sent => keys::challenges_sent(user_id),
    }
}

fn validate_group(player_ids: &[String], min_players: usize, max_players: usize) -> AppResult<()> {
    if min_players < 2 {
        return Err(AppError::invalid_argument("min_players must be at least 2"));
    }
    if max_players < min_players {
        return Err(AppError::invalid_argument(
            "max_players must not be below min_players",
        ));
    }
    if player_ids.len() < min_players {
        return Err(AppError::invalid_argument(format!(
            "{} players invited, at least {min_players} required",
            player_ids.len()
        )));
    }
    if player_ids.len() > max_players {
        return Err(AppError::invalid_argument(format!(
            "{} players invited, at most {max_players} allowed",
            player_ids.len()
        )));
    }
    let mut seen = HashSet::new();
    for id in player_ids {
        if id.trim().is_empty() {
            return Err(AppError::invalid_argument("Player id must not be empty"));
        }
        if !seen.insert(id.as_str()) {
            return Err(AppError::invalid_argument(format!(
                "Player '{id}' is invited twice"
            )));
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn new_challenge(
    initiator: &str,
    kind: ChallengeKind,
    invited: Vec<String>,
    accepted: Vec<String>,
    app_id: &str,
    (min_players, max_players): (usize, usize),
    options: serde_json::Value,
    ttl: Duration,
) -> Challenge {
    let now = Utc::now();
    Challenge {
        id: ChallengeId::new(),
        initiator: initiator.to_string(),
        kind,
        invited,
        accepted,
        app_id: app_id.to_string(),
        min_players,
        max_players,
        status: ChallengeStatus::Pending,
        created_at: now,
        expires_at: now + chrono_duration(ttl),
        options,
        session_id: None,
        version: 0,
    }
}

/// Time left until `expires_at`, at least one second.
fn remaining_ttl(challenge: &Challenge) -> Duration {
    (challenge.expires_at - Utc::now())
        .to_std()
        .unwrap_or_default()
        .max(Duration::from_secs(1))
}

fn chrono_duration(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(0))
}
