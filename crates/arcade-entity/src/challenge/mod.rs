//! Challenge domain records.

pub mod model;
pub mod status;

pub use model::Challenge;
pub use status::{ChallengeKind, ChallengeStatus};
