//! Bounded outbox for fire-and-forget side effects.
//!
//! Request paths enqueue synchronously and never wait; a full or closed
//! outbox drops the effect with a warning.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use arcade_entity::session::{EndReason, Session};

/// Result of a finished match for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    /// Participant won the match.
    Win,
    /// Participant lost the match.
    Loss,
}

/// Work to perform after a session reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    /// Store the final session snapshot in the match history.
    ArchiveMatch {
        /// Final session state.
        session: Box<Session>,
    },
    /// Update one participant's aggregate statistics.
    RecordStats {
        /// Participant.
        user_id: String,
        /// Application played.
        app_id: String,
        /// Outcome for this participant.
        result: MatchResult,
        /// How the match ended.
        end_reason: Option<EndReason>,
    },
}

impl SideEffect {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ArchiveMatch { .. } => "archive_match",
            Self::RecordStats { .. } => "record_stats",
        }
    }

    /// Build every side effect owed for a terminal session.
    pub fn for_finished_session(session: &Session) -> Vec<Self> {
        let mut effects = vec![Self::ArchiveMatch {
            session: Box::new(session.clone()),
        }];
        for participant in &session.participants {
            let result = if session.winner.as_deref() == Some(participant.id.as_str()) {
                MatchResult::Win
            } else {
                MatchResult::Loss
            };
            effects.push(Self::RecordStats {
                user_id: participant.id.clone(),
                app_id: session.app_id.clone(),
                result,
                end_reason: session.end_reason,
            });
        }
        effects
    }
}

/// A queued side effect.
#[derive(Debug, Clone)]
pub struct OutboxItem {
    /// The effect to perform.
    pub effect: SideEffect,
    /// When it was enqueued.
    pub enqueued_at: DateTime<Utc>,
}

/// Sending half of the outbox. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    /// Channel sender.
    tx: mpsc::Sender<OutboxItem>,
    /// Items enqueued but not yet picked up.
    depth: Arc<AtomicUsize>,
}

/// Receiving half of the outbox, owned by the runner.
#[derive(Debug)]
pub struct OutboxReceiver {
    /// Channel receiver.
    rx: mpsc::Receiver<OutboxItem>,
    /// Shared depth counter.
    depth: Arc<AtomicUsize>,
}

impl Outbox {
    /// Create an outbox holding at most `capacity` pending effects.
    pub fn channel(capacity: usize) -> (Self, OutboxReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let depth = Arc::new(AtomicUsize::new(0));
        (
            Self {
                tx,
                depth: Arc::clone(&depth),
            },
            OutboxReceiver { rx, depth },
        )
    }

    /// Enqueue a side effect without waiting. Returns `false` if dropped.
    pub fn enqueue(&self, effect: SideEffect) -> bool {
        let kind = effect.kind();
        let item = OutboxItem {
            effect,
            enqueued_at: Utc::now(),
        };
        match self.tx.try_send(item) {
            Ok(()) => {
                self.depth.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(kind, "Enqueued side effect");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(kind, "Outbox full, dropping side effect");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(kind, "Outbox closed, dropping side effect");
                false
            }
        }
    }

    /// Enqueue every side effect owed for a terminal session.
    pub fn enqueue_finished(&self, session: &Session) {
        for effect in SideEffect::for_finished_session(session) {
            self.enqueue(effect);
        }
    }

    /// Number of effects waiting to be picked up.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}

impl OutboxReceiver {
    /// Wait for the next effect. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<OutboxItem> {
        let item = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::Relaxed);
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(user: &str) -> SideEffect {
        SideEffect::RecordStats {
            user_id: user.to_string(),
            app_id: "tictactoe".to_string(),
            result: MatchResult::Win,
            end_reason: Some(EndReason::SeriesWon),
        }
    }

    #[tokio::test]
    async fn test_full_outbox_drops() {
        let (outbox, mut rx) = Outbox::channel(1);
        assert!(outbox.enqueue(effect("a")));
        assert!(!outbox.enqueue(effect("b")));
        assert_eq!(outbox.depth(), 1);

        let item = rx.recv().await.unwrap();
        assert_eq!(item.effect, effect("a"));
        assert_eq!(outbox.depth(), 0);
    }

    #[tokio::test]
    async fn test_closed_outbox_drops() {
        let (outbox, rx) = Outbox::channel(4);
        drop(rx);
        assert!(!outbox.enqueue(effect("a")));
    }
}
