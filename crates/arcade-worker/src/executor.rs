//! Effect executor: the handler seam the runner dispatches to.

use async_trait::async_trait;

use arcade_core::error::AppError;

use crate::queue::SideEffect;

/// Trait for side-effect handler implementations.
#[async_trait]
pub trait EffectHandler: Send + Sync + std::fmt::Debug {
    /// Handler name for logs.
    fn name(&self) -> &str;

    /// Perform the side effect once.
    async fn handle(&self, effect: &SideEffect) -> Result<(), EffectError>;
}

/// Error from effect execution.
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    /// Permanent failure, do not retry.
    #[error("Permanent effect failure: {0}")]
    Permanent(String),

    /// Transient failure, may retry.
    #[error("Transient effect failure: {0}")]
    Transient(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl EffectError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Permanent(_) => false,
            Self::Internal(err) => err.is_retryable(),
        }
    }
}
