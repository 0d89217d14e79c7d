//! Game backend routing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Application id → backend mapping.
///
/// A value of `"builtin"` routes to an in-process game; anything else is
/// treated as the base URL of a remote game backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamesConfig {
    /// Backend per application id.
    #[serde(default = "default_backends")]
    pub backends: HashMap<String, String>,
    /// Timeout for remote session-creation calls, in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

/// Resolved backend kind for an application id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameBackendKind {
    /// Served in-process.
    Builtin,
    /// Served by a remote backend at this base URL.
    Remote(String),
}

impl GamesConfig {
    /// Resolve the backend for an application id.
    pub fn backend(&self, app_id: &str) -> Option<GameBackendKind> {
        self.backends.get(app_id).map(|v| {
            if v.eq_ignore_ascii_case("builtin") {
                GameBackendKind::Builtin
            } else {
                GameBackendKind::Remote(v.trim_end_matches('/').to_string())
            }
        })
    }
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_backends() -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("tictactoe".to_string(), "builtin".to_string());
    map
}

fn default_request_timeout() -> u64 {
    5000
}
