//! Health check handler.

use axum::Json;
use axum::extract::State;

use arcade_core::traits::store::EphemeralStore;
use arcade_core::types::ApiResponse;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let store_reachable = match state.store.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    Json(ApiResponse::ok(HealthResponse {
        status: if store_reachable { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.provider_name().to_string(),
        store_reachable,
        ws_connections: state.realtime.connection_count(),
        outbox_depth: state.outbox.depth(),
    }))
}
