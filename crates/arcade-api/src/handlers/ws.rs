//! WebSocket upgrade handlers.
//!
//! Each connection forwards store topic payloads verbatim, interleaved
//! with keepalive pings. Inbound frames are read only to notice closes.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use arcade_core::types::SessionId;
use arcade_realtime::Subscription;
use arcade_realtime::connection::keepalive::ping_frame;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::extractors::path::parse_id;
use crate::state::AppState;

/// Identity query parameters for WebSocket connections.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// User ID.
    #[serde(default)]
    pub user_id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl WsQuery {
    fn identity(&self) -> Result<AuthUser, ApiError> {
        Ok(AuthUser::new(&self.user_id, self.name.as_deref())?)
    }
}

/// GET /ws/notifications?user_id=..&name=..
pub async fn notifications(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let user = query.identity()?;
    Ok(ws.on_upgrade(move |socket| notification_connection(state, user, socket)))
}

/// GET /ws/sessions/{id}?user_id=..&name=..
pub async fn session(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let user = query.identity()?;
    let session_id: SessionId = parse_id(&id)?;
    Ok(ws.on_upgrade(move |socket| session_connection(state, user, session_id, socket)))
}

async fn notification_connection(state: AppState, user: AuthUser, mut socket: WebSocket) {
    let subscription = match state
        .realtime
        .open_notifications(&user.user_id, &user.display_name)
        .await
    {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(user_id = %user.user_id, error = %e, "Notification stream refused");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    pump(&state, &user.user_id, subscription, socket).await;
    state.realtime.close_notifications(&user.user_id).await;
}

async fn session_connection(
    state: AppState,
    user: AuthUser,
    session_id: SessionId,
    mut socket: WebSocket,
) {
    let subscription = match state.realtime.open_session(session_id, &user.user_id).await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(%session_id, user_id = %user.user_id, error = %e, "Session stream refused");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    pump(&state, &user.user_id, subscription, socket).await;
    state.realtime.close_session(session_id, &user.user_id).await;
}

/// Send the snapshot, then forward events and pings until either side
/// goes away or the server shuts down.
async fn pump(state: &AppState, user_id: &str, subscription: Subscription, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let Subscription {
        snapshot,
        mut events,
    } = subscription;

    match snapshot.to_json() {
        Ok(frame) => {
            if send_text(&mut ws_tx, frame).await.is_err() {
                return;
            }
        }
        Err(e) => {
            warn!(%user_id, error = %e, "Failed to serialize snapshot");
            return;
        }
    }

    let mut keepalive = state.realtime.keepalive();
    let mut shutdown = state.realtime.shutdown_receiver();

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(payload) => {
                    if send_text(&mut ws_tx, payload).await.is_err() {
                        break;
                    }
                }
                None => {
                    debug!(%user_id, "Event stream ended");
                    break;
                }
            },
            _ = keepalive.tick() => {
                if send_text(&mut ws_tx, ping_frame()).await.is_err() {
                    break;
                }
            }
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(%user_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = shutdown.recv() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    info!(%user_id, "WebSocket connection closed");
}

async fn send_text(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    payload: String,
) -> Result<(), axum::Error> {
    ws_tx.send(Message::Text(payload.into())).await
}
