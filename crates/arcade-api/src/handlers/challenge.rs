//! Challenge handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use arcade_core::error::AppError;
use arcade_core::types::{ApiResponse, ChallengeId};
use arcade_entity::challenge::Challenge;

use crate::dto::request::{CreateChallengeRequest, CreateGroupChallengeRequest};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::extractors::path::parse_id;
use crate::state::AppState;

type ChallengeResponse = Json<ApiResponse<Challenge>>;

/// POST /api/challenges
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<(StatusCode, ChallengeResponse), ApiError> {
    let challenge = state
        .challenges
        .create_challenge(&auth.user_id, &req.to, &req.app_id, req.options)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(challenge))))
}

/// POST /api/challenges/group
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateGroupChallengeRequest>,
) -> Result<(StatusCode, ChallengeResponse), ApiError> {
    let max_players = req.max_players.unwrap_or(req.player_ids.len());
    let challenge = state
        .challenges
        .create_multi_challenge(
            &auth.user_id,
            &req.player_ids,
            &req.app_id,
            req.min_players,
            max_players,
            req.options,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(challenge))))
}

/// GET /api/challenges/incoming
pub async fn incoming(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<Challenge>>>, ApiError> {
    let challenges = state.challenges.incoming(&auth.user_id).await?;
    Ok(Json(ApiResponse::ok(challenges)))
}

/// GET /api/challenges/outgoing
pub async fn outgoing(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<Challenge>>>, ApiError> {
    let challenges = state.challenges.outgoing(&auth.user_id).await?;
    Ok(Json(ApiResponse::ok(challenges)))
}

/// GET /api/challenges/{id}
pub async fn get_challenge(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<ChallengeResponse, ApiError> {
    let id: ChallengeId = parse_id(&id)?;
    let challenge = state.challenges.get(id).await?;
    if !challenge.involves(&auth.user_id) {
        return Err(AppError::forbidden("Not part of this challenge").into());
    }
    Ok(Json(ApiResponse::ok(challenge)))
}

/// POST /api/challenges/{id}/accept
pub async fn accept(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<ChallengeResponse, ApiError> {
    let id: ChallengeId = parse_id(&id)?;
    let challenge = state.orchestrator.accept(id, &auth.user_id).await?;
    Ok(Json(ApiResponse::ok(challenge)))
}

/// POST /api/challenges/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<ChallengeResponse, ApiError> {
    let id: ChallengeId = parse_id(&id)?;
    let challenge = state.challenges.reject(id, &auth.user_id).await?;
    Ok(Json(ApiResponse::ok(challenge)))
}
