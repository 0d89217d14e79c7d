//! Route definitions for the arcade HTTP API.
//!
//! REST routes are organized by domain and mounted under `/api`; the
//! WebSocket upgrades live under `/ws`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router with all routes and the logging middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(presence_routes())
        .merge(challenge_routes())
        .merge(session_routes())
        .merge(game_routes())
        .route("/health", get(handlers::health::health));

    let ws_routes = Router::new()
        .route("/ws/notifications", get(handlers::ws::notifications))
        .route("/ws/sessions/{id}", get(handlers::ws::session));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Heartbeat, offline, and online listing
fn presence_routes() -> Router<AppState> {
    Router::new()
        .route("/presence/heartbeat", post(handlers::presence::heartbeat))
        .route("/presence", delete(handlers::presence::go_offline))
        .route("/presence/online", get(handlers::presence::list_online))
        .route("/presence/{user_id}", get(handlers::presence::get_presence))
}

/// Pairwise and group challenges
fn challenge_routes() -> Router<AppState> {
    Router::new()
        .route("/challenges", post(handlers::challenge::create))
        .route("/challenges/group", post(handlers::challenge::create_group))
        .route("/challenges/incoming", get(handlers::challenge::incoming))
        .route("/challenges/outgoing", get(handlers::challenge::outgoing))
        .route("/challenges/{id}", get(handlers::challenge::get_challenge))
        .route("/challenges/{id}/accept", post(handlers::challenge::accept))
        .route("/challenges/{id}/reject", post(handlers::challenge::reject))
}

/// Session reads and actions
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/{id}", get(handlers::session::get_session))
        .route("/sessions/{id}/move", post(handlers::session::make_move))
        .route("/sessions/{id}/forfeit", post(handlers::session::forfeit))
        .route("/sessions/{id}/claim-win", post(handlers::session::claim_win))
}

/// Built-in game backend contract
fn game_routes() -> Router<AppState> {
    Router::new().route(
        "/games/tictactoe/session",
        post(handlers::game::create_grid_session),
    )
}
