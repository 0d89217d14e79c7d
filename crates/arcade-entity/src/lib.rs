//! # arcade-entity
//!
//! Domain records for the arcade lobby. Every struct in this crate is
//! stored as JSON in the ephemeral store or sent over the realtime
//! channel. All records derive `Debug`, `Clone`, `Serialize`, and
//! `Deserialize`.

pub mod challenge;
pub mod event;
pub mod presence;
pub mod session;
