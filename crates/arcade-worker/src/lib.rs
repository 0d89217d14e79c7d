//! Side-effect outbox for the arcade lobby.
//!
//! This crate provides:
//! - A bounded in-process outbox that request paths enqueue into
//! - An effect executor that dispatches side effects to a handler
//! - A runner that drains the outbox with retry and exponential backoff
//! - Built-in handlers that deliver finished matches to a history sink

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;

pub use queue::{Outbox, OutboxReceiver, SideEffect};
pub use runner::OutboxRunner;
