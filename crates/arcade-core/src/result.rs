//! Convenience result type alias for the arcade lobby.

use crate::error::AppError;

/// A specialized `Result` type for lobby operations.
pub type AppResult<T> = Result<T, AppError>;
