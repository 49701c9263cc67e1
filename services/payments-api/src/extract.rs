//! Caller identity forwarded by the gateway

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use linkup_types::{Role, UserId};

use crate::error::ApiError;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub user_id: UserId,
    pub role: Role,
}

impl Requester {
    /// Reject callers that are not administrators
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin access required".into()))
        }
    }
}

impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| UserId::parse(v.trim()).ok())
            .ok_or(ApiError::Unauthorized)?;

        // A missing role header is an ordinary user; an unknown one is rejected
        let role = match parts.headers.get(USER_ROLE_HEADER) {
            None => Role::User,
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<Role>().ok())
                .ok_or(ApiError::Unauthorized)?,
        };

        Ok(Self { user_id, role })
    }
}
