//! Match session domain records.

pub mod model;
pub mod status;

pub use model::{BOARD_SLOTS, Board, Participant, RoundResult, Session};
pub use status::{EndReason, SessionStatus, Symbol};
