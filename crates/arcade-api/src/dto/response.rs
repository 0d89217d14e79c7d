//! Response DTOs.

use serde::{Deserialize, Serialize};

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Store provider name.
    pub store: String,
    /// Whether the store answered.
    pub store_reachable: bool,
    /// Open WebSocket connections.
    pub ws_connections: usize,
    /// Side effects waiting in the outbox.
    pub outbox_depth: usize,
}
