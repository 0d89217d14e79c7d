//! Game backend contract.
//!
//! A game backend turns a resolved challenge into a session. Remote
//! backends speak `POST {base}/session`; the grid game is also served
//! in-process.

pub mod http;
pub mod local;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use arcade_core::result::AppResult;
use arcade_core::types::{ChallengeId, SessionId};

pub use http::HttpGameBackend;
pub use local::LocalGridBackend;
pub use registry::BackendRegistry;

/// A player handed to a game backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendParticipant {
    /// User ID.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Body of a session-creation request.
///
/// Game options from the challenge are flattened into the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Challenge being started.
    pub challenge_id: ChallengeId,
    /// Players, first mover first.
    pub participants: Vec<BackendParticipant>,
    /// Challenge initiator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator_id: Option<String>,
    /// Forwarded game options.
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Body of a session-creation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Whether the session was created.
    pub success: bool,
    /// Created session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Creates sessions for one application.
#[async_trait]
pub trait GameBackend: Send + Sync + std::fmt::Debug {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Most players one session can seat; `None` if the backend does not say.
    fn max_participants(&self) -> Option<usize> {
        None
    }

    /// Create a session and return its id.
    async fn create_session(&self, request: &SessionRequest) -> AppResult<SessionId>;
}
