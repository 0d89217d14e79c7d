//! Core traits defined in `arcade-core` and implemented by other crates.

pub mod liveness;
pub mod store;

pub use liveness::ConnectionLiveness;
pub use store::{EphemeralStore, StoreExt, TopicStream};
