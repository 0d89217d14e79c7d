//! `AuthUser` extractor: caller identity from the upstream auth proxy.
//!
//! Authentication happens in front of this service. The proxy forwards
//! the user id in `X-User-Id` and, optionally, a display name in
//! `X-User-Name`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use arcade_core::error::AppError;

use crate::error::ApiError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the caller's display name.
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Identity of the calling user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// User ID.
    pub user_id: String,
    /// Display name, the user id when none was sent.
    pub display_name: String,
}

impl AuthUser {
    /// Build an identity from raw values; the id must be non-blank.
    pub fn new(user_id: &str, display_name: Option<&str>) -> Result<Self, AppError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::unauthenticated("Missing user identity"));
        }
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(user_id);
        Ok(Self {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthenticated("Missing X-User-Id header"))?;
        Ok(Self::new(user_id, header(USER_NAME_HEADER))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::error::ErrorKind;

    #[test]
    fn test_new_defaults_name() {
        let user = AuthUser::new(" alice ", None).unwrap();
        assert_eq!(user.user_id, "alice");
        assert_eq!(user.display_name, "alice");

        let user = AuthUser::new("bob", Some("Bob B")).unwrap();
        assert_eq!(user.display_name, "Bob B");

        let err = AuthUser::new("  ", Some("x")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
    }
}
