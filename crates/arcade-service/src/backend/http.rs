//! Remote game backend over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use arcade_core::error::{AppError, ErrorKind};
use arcade_core::result::AppResult;
use arcade_core::types::SessionId;

use super::{GameBackend, SessionRequest, SessionResponse};

/// Game backend reached at `POST {base}/session`.
#[derive(Debug, Clone)]
pub struct HttpGameBackend {
    /// HTTP client.
    client: reqwest::Client,
    /// Base URL without trailing slash.
    base_url: String,
}

impl HttpGameBackend {
    /// Create a backend client for `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
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

    /// Session-creation endpoint.
    pub fn session_url(&self) -> String {
        format!("{}/session", self.base_url)
    }
}

#[async_trait]
impl GameBackend for HttpGameBackend {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn create_session(&self, request: &SessionRequest) -> AppResult<SessionId> {
        let url = self.session_url();
        debug!(%url, challenge_id = %request.challenge_id, "Requesting session from game backend");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Game backend unreachable", e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "Game backend rejected session creation");
            return Err(AppError::internal(format!(
                "Game backend returned {status}"
            )));
        }

        let body: SessionResponse = response.json().await.map_err(|e| {
            AppError::with_source(ErrorKind::Internal, "Invalid game backend response", e)
        })?;

        match body {
            SessionResponse {
                success: true,
                session_id: Some(session_id),
                ..
            } => Ok(session_id),
            SessionResponse { error, .. } => Err(AppError::internal(format!(
                "Game backend failed to create session: {}",
                error.unwrap_or_else(|| "no session id".to_string())
            ))),
        }
    }
}
