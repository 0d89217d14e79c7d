//! Outbox runner: drains the outbox and executes side effects with retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing;

use arcade_core::config::WorkerConfig;

use crate::executor::{EffectError, EffectHandler};
use crate::queue::{OutboxItem, OutboxReceiver};

/// Background task that drains the outbox.
#[derive(Debug)]
pub struct OutboxRunner {
    /// Outbox receiving half.
    receiver: OutboxReceiver,
    /// Handler every effect is dispatched to.
    handler: Arc<dyn EffectHandler>,
    /// Worker configuration.
    config: WorkerConfig,
}

impl OutboxRunner {
    /// Create a new runner.
    pub fn new(
        receiver: OutboxReceiver,
        handler: Arc<dyn EffectHandler>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            receiver,
            handler,
            config,
        }
    }

    /// Run until the cancel signal is received or every sender is dropped.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            handler = self.handler.name(),
            concurrency = self.config.concurrency,
            max_attempts = self.config.max_attempts,
            "Outbox runner started"
        );

        let concurrency = self.config.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));

        loop {
            let item = tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!("Outbox runner received shutdown signal");
                        break;
                    }
                    continue;
                }
                item = self.receiver.recv() => item,
            };

            let Some(item) = item else {
                tracing::info!("Outbox closed, runner stopping");
                break;
            };

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let handler = Arc::clone(&self.handler);
            let max_attempts = self.config.max_attempts.max(1);
            let base_backoff = Duration::from_millis(self.config.base_backoff_ms);

            tokio::spawn(async move {
                let _permit = permit;
                deliver(handler.as_ref(), item, max_attempts, base_backoff).await;
            });
        }

        tracing::info!("Outbox runner waiting for in-flight effects to complete...");
        let _ = time::timeout(
            Duration::from_secs(10),
            semaphore.acquire_many(concurrency as u32),
        )
        .await;
        tracing::info!("Outbox runner shut down complete");
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
}

/// Execute one effect, retrying transient failures with exponential backoff.
/// Returns the number of attempts made.
pub async fn deliver(
    handler: &dyn EffectHandler,
    item: OutboxItem,
    max_attempts: u32,
    base_backoff: Duration,
) -> u32 {
    let kind = item.effect.kind();
    let mut attempt = 1;

    loop {
        match handler.handle(&item.effect).await {
            Ok(()) => {
                tracing::debug!(kind, attempt, "Side effect completed");
                return attempt;
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = backoff_delay(base_backoff, attempt);
                tracing::warn!(
                    kind,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Side effect failed, retrying"
                );
                time::sleep(delay).await;
                attempt += 1;
            }
            Err(EffectError::Permanent(msg)) => {
                tracing::error!(kind, attempt, error = %msg, "Side effect failed permanently");
                return attempt;
            }
            Err(e) => {
                tracing::error!(
                    kind,
                    attempt,
                    enqueued_at = %item.enqueued_at,
                    error = %e,
                    "Side effect dropped after final attempt"
                );
                return attempt;
            }
        }
    }
}
