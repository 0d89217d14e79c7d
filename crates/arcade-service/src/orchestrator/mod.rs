//! Match orchestration: resolved challenge to running session.

pub mod service;

pub use service::MatchOrchestrator;
