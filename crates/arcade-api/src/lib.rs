//! # arcade-api
//!
//! HTTP API layer for the arcade lobby built on Axum.
//!
//! Provides the REST endpoints, the WebSocket upgrades, middleware
//! (logging, CORS), extractors, DTOs, and error mapping. [`app`] also
//! wires every service together for the server binary and for tests.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state, run_server};
pub use error::ApiError;
pub use state::AppState;
