//! Connection bookkeeping.

pub mod keepalive;
pub mod registry;
pub mod tracker;
