//! # arcade-realtime
//!
//! Real-time layer for the arcade lobby. Provides:
//!
//! - Per-user connection accounting with a connection cap
//! - Session connection liveness with disconnect grace timers
//! - Keepalive pings and the `connected` snapshot sent on every (re)connect
//!
//! Event delivery itself rides on the store's topic pub/sub, so any
//! process that publishes reaches every open connection.

pub mod connection;
pub mod server;

pub use connection::registry::ConnectionRegistry;
pub use connection::tracker::SessionTracker;
pub use server::{RealtimeEngine, Subscription};
