//! Presence handlers.

use axum::Json;
use axum::extract::{Path, State};

use arcade_core::error::AppError;
use arcade_core::types::ApiResponse;
use arcade_entity::presence::PresenceRecord;

use crate::dto::request::HeartbeatRequest;
use crate::dto::response::MessageResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/presence/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Option<Json<HeartbeatRequest>>,
) -> Result<Json<ApiResponse<PresenceRecord>>, ApiError> {
    let Json(req) = body.unwrap_or_default();
    let display_name = req.display_name.as_deref().unwrap_or(&auth.display_name);
    let record = state
        .presence
        .heartbeat(&auth.user_id, display_name, req.status, req.current_app)
        .await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// DELETE /api/presence
pub async fn go_offline(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Json<ApiResponse<MessageResponse>> {
    state.presence.remove(&auth.user_id).await;
    Json(ApiResponse::ok(MessageResponse {
        message: "Offline".to_string(),
    }))
}

/// GET /api/presence/online
pub async fn list_online(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<PresenceRecord>>>, ApiError> {
    let online = state.presence.list_online().await?;
    Ok(Json(ApiResponse::ok(online)))
}

/// GET /api/presence/{user_id}
pub async fn get_presence(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<PresenceRecord>>, ApiError> {
    let record = state
        .presence
        .get(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User '{user_id}' is offline")))?;
    Ok(Json(ApiResponse::ok(record)))
}
