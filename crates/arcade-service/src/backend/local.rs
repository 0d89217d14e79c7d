//! In-process backend for the grid game.

use std::sync::Arc;

use async_trait::async_trait;

use arcade_core::result::AppResult;
use arcade_core::types::SessionId;

use super::{GameBackend, SessionRequest};
use crate::game::{GameService, grid};

/// Creates grid sessions directly through the [`GameService`].
#[derive(Debug, Clone)]
pub struct LocalGridBackend {
    /// Grid game service.
    games: Arc<GameService>,
}

impl LocalGridBackend {
    /// Create a local backend.
    pub fn new(games: Arc<GameService>) -> Self {
        Self { games }
    }
}

#[async_trait]
impl GameBackend for LocalGridBackend {
    fn name(&self) -> &str {
        "builtin"
    }

    fn max_participants(&self) -> Option<usize> {
        Some(grid::MAX_PARTICIPANTS)
    }

    async fn create_session(&self, request: &SessionRequest) -> AppResult<SessionId> {
        let session = self.games.create_session(request).await?;
        Ok(session.id)
    }
}
