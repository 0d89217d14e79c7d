//! Game session handlers.

use axum::Json;
use axum::extract::{Path, State};

use arcade_core::types::{ApiResponse, SessionId};
use arcade_entity::session::Session;

use crate::dto::request::MoveRequest;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::extractors::path::parse_id;
use crate::state::AppState;

type SessionResponse = Json<ApiResponse<Session>>;

/// GET /api/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<SessionResponse, ApiError> {
    let id: SessionId = parse_id(&id)?;
    let session = state.games.get_session(id).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// POST /api/sessions/{id}/move
pub async fn make_move(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<SessionResponse, ApiError> {
    let id: SessionId = parse_id(&id)?;
    let session = state.games.make_move(id, &auth.user_id, req.position).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// POST /api/sessions/{id}/forfeit
pub async fn forfeit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<SessionResponse, ApiError> {
    let id: SessionId = parse_id(&id)?;
    let session = state.games.forfeit(id, &auth.user_id).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// POST /api/sessions/{id}/claim-win
pub async fn claim_win(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<SessionResponse, ApiError> {
    let id: SessionId = parse_id(&id)?;
    let session = state.games.claim_win(id, &auth.user_id).await?;
    Ok(Json(ApiResponse::ok(session)))
}
