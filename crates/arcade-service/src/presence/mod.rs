//! Presence registry.

pub mod service;

pub use service::PresenceService;
