//! # arcade-service
//!
//! Lobby services. Each service holds its dependencies as `Arc`
//! references provided at construction time; all shared state lives in
//! the injected [`EphemeralStore`](arcade_core::traits::EphemeralStore).

pub mod backend;
pub mod challenge;
pub mod game;
pub mod orchestrator;
pub mod presence;
pub mod session;

mod notify;
mod versioned;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendRegistry, GameBackend, HttpGameBackend, LocalGridBackend};
pub use challenge::{AcceptOutcome, ChallengeService};
pub use game::GameService;
pub use orchestrator::MatchOrchestrator;
pub use presence::PresenceService;
pub use session::SessionStore;
