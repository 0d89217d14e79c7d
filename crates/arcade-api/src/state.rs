//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use arcade_cache::StoreManager;
use arcade_core::config::AppConfig;
use arcade_realtime::RealtimeEngine;
use arcade_service::{ChallengeService, GameService, MatchOrchestrator, PresenceService};
use arcade_worker::Outbox;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped or cheap handles for cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// Ephemeral store (Redis or in-memory)
    pub store: Arc<StoreManager>,
    /// Side-effect outbox
    pub outbox: Outbox,

    // ── Services ─────────────────────────────────────────────
    /// Presence registry
    pub presence: Arc<PresenceService>,
    /// Challenge coordinator
    pub challenges: Arc<ChallengeService>,
    /// Match orchestrator
    pub orchestrator: Arc<MatchOrchestrator>,
    /// Grid game sessions
    pub games: Arc<GameService>,

    // ── Realtime ─────────────────────────────────────────────
    /// WebSocket realtime engine
    pub realtime: RealtimeEngine,
}
