//! Caller identity.
//!
//! Authentication happens upstream. The authorizer forwards the authenticated
//! subject in the `x-user-id` header; this service only checks that it is a
//! well-formed user id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use tally_core::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated subject.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller, as identified by the upstream authorizer.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?
            .trim()
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Self { user_id })
    }
}
