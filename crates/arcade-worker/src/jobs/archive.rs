//! Match-history delivery.
//!
//! The history service is write-only from the lobby's point of view: it
//! receives final session snapshots at `POST {base}/matches` and
//! per-participant stat updates at `POST {base}/stats`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing;

use arcade_core::error::{AppError, ErrorKind};

use crate::executor::{EffectError, EffectHandler};
use crate::queue::SideEffect;

/// Delivers side effects to a remote match-history service.
#[derive(Debug, Clone)]
pub struct HttpArchiveSink {
    /// HTTP client.
    client: reqwest::Client,
    /// Service base URL without trailing slash.
    base_url: String,
}

impl HttpArchiveSink {
    /// Create a sink posting to `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint and body for an effect.
    fn request_for(&self, effect: &SideEffect) -> (String, serde_json::Value) {
        match effect {
            SideEffect::ArchiveMatch { session } => {
                (format!("{}/matches", self.base_url), json!(session))
            }
            SideEffect::RecordStats {
                user_id,
                app_id,
                result,
                end_reason,
            } => (
                format!("{}/stats", self.base_url),
                json!({
                    "userId": user_id,
                    "appId": app_id,
                    "result": result,
                    "endReason": end_reason,
                }),
            ),
        }
    }
}

#[async_trait]
impl EffectHandler for HttpArchiveSink {
    fn name(&self) -> &str {
        "http_archive"
    }

    async fn handle(&self, effect: &SideEffect) -> Result<(), EffectError> {
        let (url, body) = self.request_for(effect);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EffectError::Transient(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(kind = effect.kind(), %url, "Delivered side effect");
            Ok(())
        } else if status.is_server_error() || status.as_u16() == 429 {
            Err(EffectError::Transient(format!("POST {url} returned {status}")))
        } else {
            Err(EffectError::Permanent(format!("POST {url} returned {status}")))
        }
    }
}

/// Writes side effects to the log when no history service is configured.
#[derive(Debug, Clone, Default)]
pub struct LogArchiveSink;

#[async_trait]
impl EffectHandler for LogArchiveSink {
    fn name(&self) -> &str {
        "log_archive"
    }

    async fn handle(&self, effect: &SideEffect) -> Result<(), EffectError> {
        match effect {
            SideEffect::ArchiveMatch { session } => {
                tracing::info!(
                    session_id = %session.id,
                    app_id = %session.app_id,
                    winner = ?session.winner,
                    status = %session.status,
                    "Match finished"
                );
            }
            SideEffect::RecordStats {
                user_id, result, ..
            } => {
                tracing::info!(%user_id, ?result, "Stat update");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MatchResult;

    #[test]
    fn test_stats_request_targets_stats_endpoint() {
        let sink = HttpArchiveSink::new("http://history.local/", Duration::from_secs(1)).unwrap();
        let (url, body) = sink.request_for(&SideEffect::RecordStats {
            user_id: "alice".to_string(),
            app_id: "tictactoe".to_string(),
            result: MatchResult::Win,
            end_reason: None,
        });
        assert_eq!(url, "http://history.local/stats");
        assert_eq!(body["userId"], "alice");
        assert_eq!(body["result"], "win");
    }

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        let effect = SideEffect::RecordStats {
            user_id: "bob".to_string(),
            app_id: "tictactoe".to_string(),
            result: MatchResult::Loss,
            end_reason: None,
        };
        assert!(LogArchiveSink.handle(&effect).await.is_ok());
    }
}
