//! Session state machine and the grid game service.

pub mod grid;
pub mod service;

pub use grid::RoundOutcome;
pub use service::GameService;
