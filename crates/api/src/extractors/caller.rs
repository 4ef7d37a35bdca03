//! Caller identity extractor.
//!
//! The upstream auth gateway authenticates the user and forwards their id in
//! `X-User-Id` and, optionally, their display name in `X-User-Name`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use domain::models::UserRef;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the authenticated user's display name.
pub const USER_NAME_HEADER: &str = "X-User-Name";

/// The authenticated user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub display_name: Option<String>,
}

impl Caller {
    /// Reads the caller from gateway headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let raw = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?;

        let user_id = Uuid::parse_str(raw)
            .map_err(|_| ApiError::Unauthorized("Invalid X-User-Id header".to_string()))?;

        let display_name = headers
            .get(USER_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(Self {
            user_id,
            display_name,
        })
    }

    pub fn to_user_ref(&self) -> UserRef {
        UserRef::new(self.user_id, self.display_name.as_deref())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by the require_caller middleware
        if let Some(caller) = parts.extensions.get::<Caller>() {
            return Ok(caller.clone());
        }
        Caller::from_headers(&parts.headers)
    }
}
