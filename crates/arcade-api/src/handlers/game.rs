//! Built-in game backend endpoint.
//!
//! Speaks the same contract remote backends implement, so the grid game
//! can also be reached over HTTP by another lobby instance.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use arcade_service::backend::{SessionRequest, SessionResponse};

use crate::error::status_for;
use crate::state::AppState;

/// POST /api/games/tictactoe/session
pub async fn create_grid_session(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> (StatusCode, Json<SessionResponse>) {
    match state.games.create_session(&req).await {
        Ok(session) => (
            StatusCode::OK,
            Json(SessionResponse {
                success: true,
                session_id: Some(session.id),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(challenge_id = %req.challenge_id, error = %e, "Grid session rejected");
            (
                status_for(e.kind).0,
                Json(SessionResponse {
                    success: false,
                    session_id: None,
                    error: Some(e.message),
                }),
            )
        }
    }
}
