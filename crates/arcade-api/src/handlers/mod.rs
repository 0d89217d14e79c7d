//! Route handlers organized by domain.

pub mod challenge;
pub mod game;
pub mod health;
pub mod presence;
pub mod session;
pub mod ws;
