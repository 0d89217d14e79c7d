//! Connection liveness as seen by game logic.

use std::time::Duration;

use crate::types::SessionId;

/// Answers whether a session participant currently has a live connection.
///
/// Implemented by the real-time layer; consumed by the game service when
/// a participant tries to claim a win.
pub trait ConnectionLiveness: Send + Sync + 'static {
    /// How long `user_id` has been disconnected from `session_id`.
    ///
    /// `None` means the user is connected, or was never seen on this
    /// session.
    fn disconnected_for(&self, session_id: &SessionId, user_id: &str) -> Option<Duration>;

    /// Grace period after which an opponent may claim the win.
    fn grace_period(&self) -> Duration;
}
