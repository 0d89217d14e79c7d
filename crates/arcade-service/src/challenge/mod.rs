//! Challenge coordinator.

pub mod outcome;
pub mod service;

pub use outcome::AcceptOutcome;
pub use service::ChallengeService;
