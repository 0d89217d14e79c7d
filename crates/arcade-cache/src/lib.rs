//! # arcade-cache
//!
//! Ephemeral store implementations for the arcade lobby. Supports two modes:
//!
//! - **memory**: In-process store using [moka](https://crates.io/crates/moka)
//!   with per-entry expiry and broadcast-channel pub/sub
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StoreManager;
