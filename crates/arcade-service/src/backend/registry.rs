//! Application id → game backend lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use arcade_core::config::{GameBackendKind, GamesConfig};
use arcade_core::error::AppError;
use arcade_core::result::AppResult;

use super::{GameBackend, HttpGameBackend};

/// Routes each application id to its backend.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    /// Registered backends by application id.
    backends: HashMap<String, Arc<dyn GameBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration. `builtin` entries use `builtin`.
    pub fn from_config(config: &GamesConfig, builtin: Arc<dyn GameBackend>) -> AppResult<Self> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let mut registry = Self::new();

        for app_id in config.backends.keys() {
            let backend: Arc<dyn GameBackend> = match config.backend(app_id) {
                Some(GameBackendKind::Builtin) => Arc::clone(&builtin),
                Some(GameBackendKind::Remote(url)) => Arc::new(HttpGameBackend::new(&url, timeout)?),
                None => continue,
            };
            registry.register(app_id, backend);
        }
        Ok(registry)
    }

    /// Register a backend for an application id.
    pub fn register(&mut self, app_id: &str, backend: Arc<dyn GameBackend>) {
        info!(%app_id, backend = backend.name(), "Registered game backend");
        self.backends.insert(app_id.to_string(), backend);
    }

    /// Whether the application id is known.
    pub fn contains(&self, app_id: &str) -> bool {
        self.backends.contains_key(app_id)
    }

    /// Backend for an application id.
    pub fn get(&self, app_id: &str) -> AppResult<Arc<dyn GameBackend>> {
        self.backends
            .get(app_id)
            .cloned()
            .ok_or_else(|| AppError::invalid_argument(format!("Unknown application '{app_id}'")))
    }

    /// Seat limit of an application's backend, if it has one.
    pub fn max_participants(&self, app_id: &str) -> Option<usize> {
        self.backends
            .get(app_id)
            .and_then(|backend| backend.max_participants())
    }

    /// Registered application ids, sorted.
    pub fn app_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.backends.keys().cloned().collect();
        ids.sort();
        ids
    }
}
