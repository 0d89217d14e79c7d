//! Response envelopes for API endpoints.

use serde::{Deserialize, Serialize};

/// Successful API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true` for this envelope.
    pub success: bool,
    /// Response payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}
