//! Application builder: wires services, router, and middleware into an
//! Axum app, and runs the server.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tracing::{error, info, warn};

use arcade_cache::StoreManager;
use arcade_core::config::{AppConfig, CorsConfig};
use arcade_core::error::{AppError, ErrorKind};
use arcade_core::result::AppResult;
use arcade_core::traits::store::EphemeralStore;
use arcade_realtime::{RealtimeEngine, SessionTracker};
use arcade_service::{
    BackendRegistry, ChallengeService, GameBackend, GameService, LocalGridBackend,
    MatchOrchestrator, PresenceService, SessionStore,
};
use arcade_worker::{Outbox, OutboxReceiver, OutboxRunner};

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState, cors_config: &CorsConfig) -> Router {
    build_router(state)
        .layer(build_cors_layer(cors_config))
}

/// Wire every service around an initialized store.
///
/// Returns the shared state and the receiving half of the outbox, which
/// the caller hands to an [`OutboxRunner`].
pub fn build_state(config: AppConfig, store: Arc<StoreManager>) -> AppResult<(AppState, OutboxReceiver)> {
    let provider = store.provider();
    let lobby = config.lobby.clone();

    let (outbox, outbox_rx) = Outbox::channel(config.worker.outbox_capacity);

    let presence = Arc::new(PresenceService::new(Arc::clone(&provider), lobby.clone()));
    let sessions = Arc::new(SessionStore::new(Arc::clone(&provider), lobby.clone()));
    let tracker = Arc::new(SessionTracker::new(
        Arc::clone(&provider),
        Arc::clone(&sessions),
        config.realtime.disconnect_grace(),
    ));
    let games = Arc::new(GameService::new(
        sessions,
        Arc::clone(&provider),
        Arc::clone(&tracker) as _,
        outbox.clone(),
    ));

    let builtin: Arc<dyn GameBackend> = Arc::new(LocalGridBackend::new(Arc::clone(&games)));
    let backends = Arc::new(BackendRegistry::from_config(&config.games, builtin)?);
    info!(apps = ?backends.app_ids(), "Game backends ready");

    let challenges = Arc::new(ChallengeService::new(
        Arc::clone(&provider),
        Arc::clone(&presence),
        Arc::clone(&backends),
        lobby,
    ));
    let orchestrator = Arc::new(MatchOrchestrator::new(
        Arc::clone(&challenges),
        Arc::clone(&presence),
        backends,
        Arc::clone(&provider),
    ));
    let realtime = RealtimeEngine::new(
        config.realtime.clone(),
        provider,
        Arc::clone(&presence),
        Arc::clone(&challenges),
        tracker,
    );

    let state = AppState {
        config: Arc::new(config),
        store,
        outbox,
        presence,
        challenges,
        orchestrator,
        games,
        realtime,
    };
    Ok((state, outbox_rx))
}

/// Runs the lobby server until Ctrl-C.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    info!(provider = %config.store.provider, "Initializing store");
    let store = Arc::new(StoreManager::new(&config.store).await?);
    if !store.health_check().await? {
        warn!(provider = store.provider_name(), "Store did not answer the health check");
    }

    let (state, outbox_rx) = build_state(config.clone(), store)?;

    // ── Outbox runner ────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handler = arcade_worker::jobs::history_sink(&config.worker)?;
    let runner = OutboxRunner::new(outbox_rx, handler, config.worker.clone());
    let worker_handle = tokio::spawn(runner.run(shutdown_rx));

    // ── HTTP server ──────────────────────────────────────────────
    let app = build_app(state.clone(), &config.server.cors);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e))?;

    info!(%addr, "Arcade lobby listening");

    let realtime = state.realtime.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            realtime.shutdown();
        })
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e))?;

    // ── Drain ────────────────────────────────────────────────────
    if shutdown_tx.send(true).is_err() {
        warn!("Outbox runner already stopped");
    }
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    match tokio::time::timeout(grace, worker_handle).await {
        Ok(Ok(())) => info!("Outbox runner stopped"),
        Ok(Err(e)) => error!(error = %e, "Outbox runner panicked"),
        Err(_) => warn!(grace_seconds = grace.as_secs(), "Outbox runner did not stop in time"),
    }

    info!("Arcade lobby stopped");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, starting graceful shutdown");
}
